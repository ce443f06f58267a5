//! 対話モード
//!
//! 入力方法の選択 → 撮影/ファイル選択 → 結果表示 → やり直し、をメニューで回す

use dialoguer::{Input, Select};

use crate::error::{FinderError, Result};
use crate::render::{render_snapshot, wait_with_spinner};
use crate::runner::SessionHandle;
use fashion_finder_common::{build_share_text, InputMode, SessionSnapshot};

/// メニュー項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    UseWebcam,
    UploadImage,
    Capture,
    SelectFile,
    ClearImage,
    StartOver,
    DismissError,
    Share,
    Quit,
}

impl MenuAction {
    pub fn label(&self, snapshot: &SessionSnapshot) -> &'static str {
        match self {
            MenuAction::UseWebcam => "Use Webcam",
            MenuAction::UploadImage => "Upload Image",
            MenuAction::Capture if snapshot.has_image() => "Retake photo",
            MenuAction::Capture => "Capture photo",
            MenuAction::SelectFile if snapshot.has_image() => "Choose another image",
            MenuAction::SelectFile => "Choose image file",
            MenuAction::ClearImage => "Clear image",
            MenuAction::StartOver => match (snapshot.has_image(), snapshot.input_mode) {
                (false, InputMode::Webcam) => "Switch to Upload Image",
                (false, InputMode::Upload) => "Switch to Webcam",
                _ => "Start Over",
            },
            MenuAction::DismissError => "Dismiss error",
            MenuAction::Share => "Share results",
            MenuAction::Quit => "Quit",
        }
    }
}

/// 現在の状態で選べる操作
pub fn available_actions(snapshot: &SessionSnapshot) -> Vec<MenuAction> {
    if snapshot.shows_mode_chooser() {
        return vec![MenuAction::UseWebcam, MenuAction::UploadImage, MenuAction::Quit];
    }

    let mut actions = Vec::new();
    if !snapshot.is_busy() {
        match snapshot.input_mode {
            InputMode::Webcam => actions.push(MenuAction::Capture),
            InputMode::Upload => actions.push(MenuAction::SelectFile),
            InputMode::None => {}
        }
        if snapshot.has_image() {
            actions.push(MenuAction::ClearImage);
        }
        actions.push(MenuAction::StartOver);
    }
    if snapshot.error.is_some() {
        actions.push(MenuAction::DismissError);
    }
    if snapshot.can_share() {
        actions.push(MenuAction::Share);
    }
    actions.push(MenuAction::Quit);
    actions
}

pub async fn run_interactive(handle: &SessionHandle) -> Result<()> {
    println!("👕 AI Fashion Finder");
    println!("Snap or upload your look, get AI insights, and discover similar styles!\n");

    loop {
        let snapshot = wait_with_spinner(handle).await?;

        let rendered = render_snapshot(&snapshot);
        if !rendered.is_empty() {
            println!("{}", rendered);
        }

        let actions = available_actions(&snapshot);
        let labels: Vec<&'static str> = actions.iter().map(|a| a.label(&snapshot)).collect();
        let prompt = if snapshot.shows_mode_chooser() {
            "Choose how you want to provide your outfit image"
        } else {
            "What next?"
        };

        let index = prompt_select(prompt, labels).await?;
        let Some(action) = actions.get(index).copied() else {
            continue;
        };

        match action {
            MenuAction::UseWebcam => handle.set_input_mode(InputMode::Webcam)?,
            MenuAction::UploadImage => handle.set_input_mode(InputMode::Upload)?,
            MenuAction::Capture => {
                println!("📸 Capturing...");
                handle.capture()?;
            }
            MenuAction::SelectFile => {
                let path = prompt_path().await?;
                if !path.trim().is_empty() {
                    handle.select_file(path.trim())?;
                }
            }
            MenuAction::ClearImage => handle.clear()?,
            MenuAction::StartOver => handle.start_over()?,
            MenuAction::DismissError => handle.dismiss_error()?,
            MenuAction::Share => {
                if let (Some(analysis), Some(search)) = (&snapshot.analysis, &snapshot.search_result) {
                    println!("\n{}\n", build_share_text(analysis, search));
                }
            }
            MenuAction::Quit => break,
        }
    }

    Ok(())
}

/// dialoguerはブロッキングなので専用スレッドで実行
async fn prompt_select(prompt: &'static str, labels: Vec<&'static str>) -> Result<usize> {
    tokio::task::spawn_blocking(move || {
        Select::new()
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact()
            .map_err(|e| FinderError::CliExecution(e.to_string()))
    })
    .await
    .map_err(|e| FinderError::CliExecution(e.to_string()))?
}

async fn prompt_path() -> Result<String> {
    tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("Image path")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| FinderError::CliExecution(e.to_string()))
    })
    .await
    .map_err(|e| FinderError::CliExecution(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use fashion_finder_common::{ImagePayload, OutfitAnalysisResult, SimilarItemsSearchResult};

    #[test]
    fn test_chooser_actions() {
        let snapshot = SessionSnapshot::default();
        assert_eq!(
            available_actions(&snapshot),
            vec![MenuAction::UseWebcam, MenuAction::UploadImage, MenuAction::Quit]
        );
    }

    #[test]
    fn test_webcam_actions_without_image() {
        let snapshot = SessionSnapshot {
            input_mode: InputMode::Webcam,
            ..Default::default()
        };
        let actions = available_actions(&snapshot);
        assert_eq!(actions, vec![MenuAction::Capture, MenuAction::StartOver, MenuAction::Quit]);
        assert_eq!(MenuAction::StartOver.label(&snapshot), "Switch to Upload Image");
        assert_eq!(MenuAction::Capture.label(&snapshot), "Capture photo");
    }

    #[test]
    fn test_busy_hides_start_over() {
        let snapshot = SessionSnapshot {
            input_mode: InputMode::Upload,
            image: Some(ImagePayload::new("AAAA", "image/jpeg").unwrap()),
            is_analyzing: true,
            ..Default::default()
        };
        assert_eq!(available_actions(&snapshot), vec![MenuAction::Quit]);
    }

    #[test]
    fn test_finished_session_actions() {
        let snapshot = SessionSnapshot {
            input_mode: InputMode::Upload,
            image: Some(ImagePayload::new("AAAA", "image/jpeg").unwrap()),
            analysis: Some(OutfitAnalysisResult::default()),
            search_result: Some(SimilarItemsSearchResult::default()),
            error: Some("stale warning".to_string()),
            ..Default::default()
        };
        let actions = available_actions(&snapshot);
        assert_eq!(
            actions,
            vec![
                MenuAction::SelectFile,
                MenuAction::ClearImage,
                MenuAction::StartOver,
                MenuAction::DismissError,
                MenuAction::Share,
                MenuAction::Quit,
            ]
        );
        assert_eq!(MenuAction::StartOver.label(&snapshot), "Start Over");
        assert_eq!(MenuAction::SelectFile.label(&snapshot), "Choose another image");
    }
}
