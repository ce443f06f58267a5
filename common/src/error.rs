//! エラー型定義

use thiserror::Error;

/// 共通エラー型（レスポンス解析の失敗）
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

/// Step1（服装解析）の失敗。表示用メッセージのみを持つ
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AnalysisError(pub String);

/// Step2（類似アイテム検索）の失敗
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SearchError(pub String);

/// 入力側の失敗（ファイル読込不可、カメラ使用不可など）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InputError(pub String);

macro_rules! impl_message_ctor {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                pub fn new(message: impl Into<String>) -> Self {
                    Self(message.into())
                }

                pub fn message(&self) -> &str {
                    &self.0
                }
            }
        )*
    };
}

impl_message_ctor!(AnalysisError, SearchError, InputError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_parse() {
        let error = Error::Parse("JSONが見つかりません".to_string());
        assert_eq!(format!("{}", error), "Parse error: JSONが見つかりません");
    }

    #[test]
    fn test_stage_errors_display_message_verbatim() {
        assert_eq!(AnalysisError::new("network error").to_string(), "network error");
        assert_eq!(SearchError::new("quota exceeded").message(), "quota exceeded");
        assert_eq!(InputError::new("Error reading file.").to_string(), "Error reading file.");
    }
}
