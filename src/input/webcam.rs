use super::upload::encode_image_bytes;
use fashion_finder_common::{ImagePayload, InputError};
use std::path::{Path, PathBuf};
use tokio::process::Command;

const OUTPUT_PLACEHOLDER: &str = "{output}";

/// 外部撮影コマンドによるWebカメラ入力
///
/// コマンドは空白区切りで分割する（パスに空白を含む場合は設定側で回避）
#[derive(Debug, Clone)]
pub struct WebcamCapture {
    command: String,
    output: PathBuf,
}

impl WebcamCapture {
    pub fn new(command: impl Into<String>) -> Self {
        let output = std::env::temp_dir()
            .join(format!("fashion-finder-capture-{}.jpg", std::process::id()));
        Self {
            command: command.into(),
            output,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub async fn capture(&self) -> Result<ImagePayload, InputError> {
        let args = build_command(&self.command, &self.output);
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| InputError::new("Camera unavailable: no capture command configured."))?;

        tracing::debug!("撮影コマンド: {:?}", args);

        // タイムアウトで破棄されたら撮影プロセスも止める
        let output = Command::new(program)
            .args(rest)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| InputError::new(format!("Camera unavailable: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("撮影コマンド失敗 (code {:?}): {}", output.status.code(), stderr);
            return Err(InputError::new(format!(
                "Camera unavailable: capture command failed ({})",
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(&self.output)
            .await
            .map_err(|_| InputError::new("Camera unavailable: no image was captured."))?;

        encode_image_bytes(&bytes)
    }

    /// 撮影済みファイルを削除
    pub fn clear(&mut self) {
        if self.output.exists() {
            if let Err(e) = std::fs::remove_file(&self.output) {
                tracing::warn!("撮影ファイル削除失敗 {}: {}", self.output.display(), e);
            }
        }
    }
}

/// コマンドテンプレートを引数列に展開
fn build_command(template: &str, output: &Path) -> Vec<String> {
    let output = output.display().to_string();
    template
        .split_whitespace()
        .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
        .collect()
}
