//! APIレスポンスパーサー
//!
//! Gemini APIのレスポンステキストからJSONを抽出し、
//! Step1（服装解析）/ Step2（類似アイテム検索）の結果をパースする

use crate::error::{Error, Result};
use crate::types::{OutfitAnalysisResult, SimilarItemsSearchResult};

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 最も外側の {...} または [...]（先に現れた方）
/// 3. エラー
///
/// Google検索ツール使用時はJSONモードが使えないため、
/// 説明文付きのレスポンスもここで吸収する
///
/// # Examples
/// ```
/// use fashion_finder_common::extract_json;
///
/// let response = "Result: {\"key\": \"value\"} done";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"key\": \"value\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    let (open, close) = match (response.find('{'), response.find('[')) {
        (Some(obj), Some(arr)) if arr < obj => ('[', ']'),
        (Some(_), _) => ('{', '}'),
        (None, Some(_)) => ('[', ']'),
        (None, None) => return Err(Error::Parse("JSONが見つかりません".into())),
    };

    if let (Some(start), Some(end)) = (response.find(open), response.rfind(close)) {
        if end > start {
            return Ok(&response[start..=end]);
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// Step1レスポンスをパース
///
/// `identified_clothing` が欠けている場合は空リストとして扱う
pub fn parse_analysis_response(response: &str) -> Result<OutfitAnalysisResult> {
    let json_str = extract_json(response)?;
    let result: OutfitAnalysisResult = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("服装解析 JSONパースエラー: {}", e)))?;
    Ok(result)
}

/// Step2レスポンスをパース
pub fn parse_similar_items_response(response: &str) -> Result<SimilarItemsSearchResult> {
    let json_str = extract_json(response)?;
    let result: SimilarItemsSearchResult = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("類似アイテム JSONパースエラー: {}", e)))?;
    Ok(result)
}
