//! 共有テキスト生成
//!
//! 解析結果と類似アイテムを1つのテキストにまとめる（SNS・メッセージ共有用）

use crate::types::{OutfitAnalysisResult, SimilarItemsSearchResult};

const SHARE_HEADLINE: &str = "My outfit, analyzed by AI Fashion Finder";

pub fn build_share_text(analysis: &OutfitAnalysisResult, search: &SimilarItemsSearchResult) -> String {
    let mut lines = vec![SHARE_HEADLINE.to_string()];

    if !analysis.overall_impression.trim().is_empty() {
        lines.push(String::new());
        lines.push(analysis.overall_impression.trim().to_string());
    }

    if analysis.has_items() {
        lines.push(String::new());
        lines.push("Items:".to_string());
        for item in &analysis.identified_clothing {
            lines.push(format!("- {} ({}, {})", item.item_name, item.color, item.item_type));
        }
    }

    // 各グループの先頭候補のみ
    let picks: Vec<String> = search
        .similar_items_suggestions
        .iter()
        .filter_map(|group| {
            group.suggestions.first().map(|s| {
                format!("- {}: {} {}", group.original_item_query, s.product_name, s.shop_link)
            })
        })
        .collect();

    if !picks.is_empty() {
        lines.push(String::new());
        lines.push("Similar finds:".to_string());
        lines.extend(picks);
    }

    lines.join("\n")
}
