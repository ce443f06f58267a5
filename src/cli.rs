use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fashion-finder")]
#[command(about = "服装写真AI解析・類似アイテム検索ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像ファイルを解析して類似アイテムを検索
    Analyze {
        /// 服装写真のパス
        #[arg(required = true)]
        image: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Webカメラで撮影して解析
    Capture {
        /// 撮影コマンド（設定値を上書き、`{output}` が保存先に置換される）
        #[arg(long)]
        command: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// 対話モード（入力方法の選択・やり直し・共有）
    Interactive,

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// モデル名を設定
        #[arg(long)]
        set_model: Option<String>,

        /// タイムアウト秒数を設定
        #[arg(long)]
        set_timeout: Option<u64>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// 結果をJSONで出力
    #[arg(long)]
    pub json: bool,

    /// 共有用テキストも出力
    #[arg(long)]
    pub share: bool,
}
