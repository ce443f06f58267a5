//! 入力ソース（ファイルアップロード / Webカメラ撮影）
//!
//! どちらも最終的にBase64画像を1枚返すか、入力エラーを返す。
//! セッションが画像を破棄したときは clear で資源を解放する

mod upload;
mod webcam;

pub use upload::{encode_image_bytes, is_image_extension, FileUpload};
pub use webcam::WebcamCapture;

use crate::config::Config;

/// 2つの入力ソースをまとめて保持
#[derive(Debug)]
pub struct InputSources {
    pub upload: FileUpload,
    pub webcam: WebcamCapture,
}

impl InputSources {
    pub fn new(upload: FileUpload, webcam: WebcamCapture) -> Self {
        Self { upload, webcam }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(FileUpload::default(), WebcamCapture::new(&config.webcam_command))
    }

    pub fn clear_all(&mut self) {
        self.upload.clear();
        self.webcam.clear();
    }
}
