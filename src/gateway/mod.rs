//! 解析ゲートウェイ
//!
//! Step1（服装解析）とStep2（類似アイテム検索）を外部AIへ委譲する境界。
//! セッション側はこのトレイトだけに依存する

mod gemini;

pub use gemini::GeminiGateway;

use fashion_finder_common::{
    AnalysisError, AnalyzedItem, GroundingChunk, ImagePayload, InputError, OutfitAnalysisResult,
    SearchError, SimilarItemsSearchResult,
};
use std::future::Future;
use std::time::Duration;

/// Step2の結果と出典
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarItemsOutcome {
    pub result: SimilarItemsSearchResult,
    pub grounding_sources: Vec<GroundingChunk>,
}

/// 外部AIサービス
///
/// どちらの操作も呼び出し1回につき最大1回のリクエストで、再試行はしない
pub trait OutfitGateway: Send + Sync {
    fn analyze(
        &self,
        image: &ImagePayload,
    ) -> impl Future<Output = Result<OutfitAnalysisResult, AnalysisError>> + Send;

    fn find_similar(
        &self,
        items: &[AnalyzedItem],
    ) -> impl Future<Output = Result<SimilarItemsOutcome, SearchError>> + Send;
}

/// ゲートウェイ呼び出しのタイムアウト
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {}s", .0.as_secs())]
pub struct TimedOut(pub Duration);

impl From<TimedOut> for AnalysisError {
    fn from(e: TimedOut) -> Self {
        AnalysisError::new(format!("Outfit analysis {}", e))
    }
}

impl From<TimedOut> for SearchError {
    fn from(e: TimedOut) -> Self {
        SearchError::new(format!("Similar item search {}", e))
    }
}

impl From<TimedOut> for InputError {
    fn from(e: TimedOut) -> Self {
        InputError::new(format!("Camera unavailable: capture {}", e))
    }
}

/// 失敗しうるfutureに上限時間を付ける
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimedOut>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TimedOut(duration).into()),
    }
}
