//! Gemini API連携（2段階解析）
//!
//! Step1: 画像＋プロンプトをJSONモードで送信し、服装解析結果を得る
//! Step2: Google検索ツール付きで類似アイテムを探し、出典情報も受け取る

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{OutfitGateway, SimilarItemsOutcome};
use crate::config::Config;
use crate::error::Result;
use fashion_finder_common::{
    build_analysis_prompt, build_similar_items_prompt, parse_analysis_response,
    parse_similar_items_response, AnalysisError, AnalyzedItem, GroundingChunk, ImagePayload,
    OutfitAnalysisResult, SearchError,
};

/// Gemini APIリクエスト
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

/// Gemini APIレスポンス
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

impl Candidate {
    /// 全テキストパートを連結（検索ツール使用時は分割されて返る）
    fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .concat()
    }

    fn into_grounding_chunks(self) -> Vec<GroundingChunk> {
        self.grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct GeminiGateway {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiGateway {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.get_api_key()?,
            config.model.clone(),
            config.api_base_url.clone(),
        ))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Gemini API呼び出し（共通処理）。失敗時は表示用メッセージを返す
    async fn call_gemini_api(&self, request: &GeminiRequest) -> std::result::Result<Candidate, String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini API request failed: {}", e);
                format!("network error: {}", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API error: {} - {}", status, error_text);
            return Err(format!("API returned {}: {}", status, error_text.trim()));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            format!("malformed response: {}", e)
        })?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| "empty response".to_string())
    }
}

impl OutfitGateway for GeminiGateway {
    async fn analyze(
        &self,
        image: &ImagePayload,
    ) -> std::result::Result<OutfitAnalysisResult, AnalysisError> {
        tracing::debug!(mime = image.mime_type(), bytes = image.data().len(), "Step1: 服装解析リクエスト");

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: build_analysis_prompt() },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type().to_string(),
                            data: image.data().to_string(),
                        },
                    },
                ],
            }],
            tools: Vec::new(),
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: Some("application/json".to_string()),
            },
        };

        let candidate = self
            .call_gemini_api(&request)
            .await
            .map_err(|e| AnalysisError::new(format!("Failed to analyze outfit: {}", e)))?;

        parse_analysis_response(&candidate.text())
            .map_err(|e| AnalysisError::new(format!("Failed to analyze outfit: {}", e)))
    }

    async fn find_similar(
        &self,
        items: &[AnalyzedItem],
    ) -> std::result::Result<SimilarItemsOutcome, SearchError> {
        tracing::debug!(items = items.len(), "Step2: 類似アイテム検索リクエスト");

        // 検索ツール使用時はJSONモード指定不可
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::Text { text: build_similar_items_prompt(items) }],
            }],
            tools: vec![Tool { google_search: GoogleSearch {} }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: None,
            },
        };

        let candidate = self
            .call_gemini_api(&request)
            .await
            .map_err(|e| SearchError::new(format!("Failed to find similar items: {}", e)))?;

        let result = parse_similar_items_response(&candidate.text())
            .map_err(|e| SearchError::new(format!("Failed to find similar items: {}", e)))?;

        Ok(SimilarItemsOutcome {
            result,
            grounding_sources: candidate.into_grounding_chunks(),
        })
    }
}
