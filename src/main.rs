use clap::Parser;
use fashion_finder::{cli, config, error, gateway, input, interactive, logging, render, runner};
use cli::{Cli, Commands, OutputArgs};
use config::Config;
use error::Result;
use fashion_finder_common::{build_share_text, InputMode, SessionSnapshot};
use gateway::GeminiGateway;
use input::{InputSources, WebcamCapture};
use runner::{spawn_session, SessionHandle};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Analyze { image, output } => {
            if !image.exists() {
                return Err(error::FinderError::FileNotFound(image.display().to_string()));
            }
            let handle = start_session(&config, InputSources::from_config(&config))?;
            handle.set_input_mode(InputMode::Upload)?;
            handle.select_file(image)?;
            finish_run(&handle, &output).await?;
        }

        Commands::Capture { command, output } => {
            let mut sources = InputSources::from_config(&config);
            if let Some(command) = command {
                sources.webcam = WebcamCapture::new(command);
            }
            let handle = start_session(&config, sources)?;
            handle.set_input_mode(InputMode::Webcam)?;
            println!("📸 Capturing...");
            handle.capture()?;
            finish_run(&handle, &output).await?;
        }

        Commands::Interactive => {
            let handle = start_session(&config, InputSources::from_config(&config))?;
            interactive::run_interactive(&handle).await?;
        }

        Commands::Config { set_api_key, set_model, set_timeout, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(model) = set_model {
                config.model = model;
                config.save()?;
                println!("✔ モデルを設定しました: {}", config.model);
            }

            if let Some(timeout) = set_timeout {
                config.timeout_seconds = timeout;
                config.save()?;
                println!("✔ タイムアウトを設定しました: {}秒", config.timeout_seconds);
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  APIエンドポイント: {}", config.api_base_url);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  撮影コマンド: {}", config.webcam_command);
                println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}

fn start_session(config: &Config, sources: InputSources) -> Result<SessionHandle> {
    let gateway = Arc::new(GeminiGateway::from_config(config)?);
    let (handle, _task) = spawn_session(gateway, sources, config.timeout());
    Ok(handle)
}

/// 解析・検索の完了を待って結果を出力
async fn finish_run(handle: &SessionHandle, output: &OutputArgs) -> Result<()> {
    let snapshot = render::wait_with_spinner(handle).await?;
    print_result(&snapshot, output)?;

    if let Some(error) = &snapshot.error {
        return Err(error::FinderError::ApiCall(error.clone()));
    }
    Ok(())
}

fn print_result(snapshot: &SessionSnapshot, output: &OutputArgs) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    } else {
        print!("{}", render::render_snapshot(snapshot));
    }

    if output.share {
        match (&snapshot.analysis, &snapshot.search_result) {
            (Some(analysis), Some(search)) if snapshot.can_share() => {
                println!("\n{}", build_share_text(analysis, search));
            }
            _ => println!("\n共有できる結果がありません"),
        }
    }
    Ok(())
}
