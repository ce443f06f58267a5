//! 解析結果の型定義
//!
//! CLIと将来のWeb(WASM)で共有される型:
//! - AnalyzedItem / OutfitAnalysisResult: Step1（服装解析）の出力
//! - ProductSuggestion / SimilarItemsSearchResult: Step2（類似アイテム検索）の出力
//! - GroundingChunk: Step2に付随する出典情報
//! - ImagePayload / InputMode: 入力側の型

use serde::{Deserialize, Serialize};

use crate::data_url::{extract_base64_from_data_url, extract_mime_type_from_data_url};
use crate::error::InputError;

/// 識別された服1点
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzedItem {
    pub item_name: String,

    #[serde(rename = "type")]
    pub item_type: String,        // カテゴリ（トップス、アウター等）

    pub color: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// 商品が特定できた場合の直接購入リンク
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_shop_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_price: Option<String>,
}

impl AnalyzedItem {
    /// 類似検索のクエリに使う説明文
    ///
    /// ブランド・色・素材・柄があれば前置して1行にまとめる
    pub fn search_description(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(brand) = self.brand.as_deref().filter(|b| !b.trim().is_empty()) {
            parts.push(brand);
        }
        if !self.color.trim().is_empty() {
            parts.push(&self.color);
        }
        if let Some(material) = self.material.as_deref().filter(|m| !m.trim().is_empty()) {
            parts.push(material);
        }
        if let Some(pattern) = self.pattern.as_deref().filter(|p| !p.trim().is_empty()) {
            parts.push(pattern);
        }
        parts.push(&self.item_name);
        parts.join(" ")
    }
}

/// Step1の出力: 服装解析結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutfitAnalysisResult {
    /// 検出順（表示順・検索順として意味を持つ）
    pub identified_clothing: Vec<AnalyzedItem>,
    pub overall_impression: String,
}

impl OutfitAnalysisResult {
    pub fn has_items(&self) -> bool {
        !self.identified_clothing.is_empty()
    }
}

/// 購入候補の商品
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSuggestion {
    pub product_name: String,
    pub shop_link: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_estimate: Option<String>,
}

/// 検索元アイテムごとの候補グループ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarItemSuggestionGroup {
    pub original_item_query: String,
    pub suggestions: Vec<ProductSuggestion>,
}

/// Step2の出力: 類似アイテム検索結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarItemsSearchResult {
    pub similar_items_suggestions: Vec<SimilarItemSuggestionGroup>,
}

/// Web出典
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebGroundingSource {
    pub uri: String,
    pub title: String,
}

/// 出典情報（中身は解釈せず表示に回すだけ）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<WebGroundingSource>,
}

/// 解析に渡す画像（Base64 + MIMEタイプ）
///
/// 空データを持たないよう `new` / `from_data_url` 経由でのみ作る
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePayload {
    data: String,
    mime_type: String,
}

impl ImagePayload {
    /// Base64文字列から作成。空データはエラー
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Result<Self, InputError> {
        let data = data.into();
        if data.trim().is_empty() {
            return Err(InputError::new("Could not read image file."));
        }
        Ok(Self {
            data,
            mime_type: mime_type.into(),
        })
    }

    /// "data:image/png;base64,..." 形式から作成
    pub fn from_data_url(data_url: &str) -> Result<Self, InputError> {
        let data = extract_base64_from_data_url(data_url)
            .ok_or_else(|| InputError::new("Could not read image file."))?;
        Self::new(data, extract_mime_type_from_data_url(data_url))
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// 入力方法の選択状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// まだ選択されていない（選択画面を表示）
    #[default]
    None,
    Webcam,
    Upload,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::None => "none",
            InputMode::Webcam => "webcam",
            InputMode::Upload => "upload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzed_item_deserialize_type_field() {
        let json = r#"{"item_name": "Denim Jacket", "type": "Outerwear", "color": "Blue"}"#;
        let item: AnalyzedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.item_name, "Denim Jacket");
        assert_eq!(item.item_type, "Outerwear");
        assert_eq!(item.color, "Blue");
        assert!(item.material.is_none());
        assert!(item.exact_shop_link.is_none());
    }

    #[test]
    fn test_analyzed_item_serialize_skips_missing_optionals() {
        let item = AnalyzedItem {
            item_name: "Sneakers".to_string(),
            item_type: "Shoes".to_string(),
            color: "White".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"type\":\"Shoes\""));
        assert!(!json.contains("material"));
        assert!(!json.contains("exact_price"));
    }

    #[test]
    fn test_search_description() {
        let item = AnalyzedItem {
            item_name: "Trench Coat".to_string(),
            item_type: "Outerwear".to_string(),
            color: "Beige".to_string(),
            material: Some("Cotton".to_string()),
            brand: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(item.search_description(), "Beige Cotton Trench Coat");
    }

    #[test]
    fn test_analysis_result_missing_list_defaults_empty() {
        let result: OutfitAnalysisResult =
            serde_json::from_str(r#"{"overall_impression": "Casual"}"#).unwrap();
        assert!(!result.has_items());
        assert_eq!(result.overall_impression, "Casual");
    }

    #[test]
    fn test_grounding_chunk_without_web() {
        let chunk: GroundingChunk = serde_json::from_str("{}").unwrap();
        assert!(chunk.web.is_none());

        let chunk: GroundingChunk =
            serde_json::from_str(r#"{"web": {"uri": "https://example.com", "title": "Example"}}"#)
                .unwrap();
        assert_eq!(chunk.web.unwrap().title, "Example");
    }

    // =============================================
    // ImagePayload テスト
    // =============================================

    #[test]
    fn test_image_payload_rejects_empty() {
        assert!(ImagePayload::new("", "image/jpeg").is_err());
        assert!(ImagePayload::new("   ", "image/jpeg").is_err());
    }

    #[test]
    fn test_image_payload_from_data_url() {
        let payload = ImagePayload::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(payload.data(), "iVBORw0KGgo=");
        assert_eq!(payload.mime_type(), "image/png");
    }

    #[test]
    fn test_image_payload_from_invalid_data_url() {
        let err = ImagePayload::from_data_url("not a data url").unwrap_err();
        assert_eq!(err.to_string(), "Could not read image file.");
    }

    #[test]
    fn test_input_mode_serde() {
        assert_eq!(serde_json::to_string(&InputMode::Webcam).unwrap(), "\"webcam\"");
        assert_eq!(InputMode::default(), InputMode::None);
    }
}
