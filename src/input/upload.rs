use base64::{engine::general_purpose, Engine as _};
use fashion_finder_common::{ImagePayload, InputError};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// 対応画像の拡張子か（大文字小文字は区別しない）
pub fn is_image_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// 画像バイト列をBase64化。MIMEタイプは中身から判定する
pub fn encode_image_bytes(bytes: &[u8]) -> Result<ImagePayload, InputError> {
    if bytes.is_empty() {
        return Err(InputError::new("Could not read image file."));
    }
    let format = image::guess_format(bytes)
        .map_err(|_| InputError::new("Unsupported image format."))?;

    ImagePayload::new(general_purpose::STANDARD.encode(bytes), format.to_mime_type())
}

/// ファイル選択による入力
#[derive(Debug, Default)]
pub struct FileUpload {
    selected: Option<PathBuf>,
}

impl FileUpload {
    /// 画像ファイルを読み込む。状態を持たないのでセッションのループ外で実行できる
    pub async fn load(path: &Path) -> Result<ImagePayload, InputError> {
        let has_image_ext = path
            .extension()
            .map(|e| is_image_extension(&e.to_string_lossy()))
            .unwrap_or(false);
        if !has_image_ext {
            return Err(InputError::new("Please select an image file (jpg, png, webp, gif, bmp)."));
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            tracing::warn!("画像読み込み失敗 {}: {}", path.display(), e);
            InputError::new("Error reading file.")
        })?;

        encode_image_bytes(&bytes)
    }

    /// 読み込みに成功したパスを記録
    pub fn set_selected(&mut self, path: impl Into<PathBuf>) {
        self.selected = Some(path.into());
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}
