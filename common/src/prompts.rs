//! プロンプト生成モジュール
//!
//! CLIと将来のWeb(WASM)で共有されるプロンプト生成ロジック:
//! - build_analysis_prompt: Step1（服装解析）用プロンプト
//! - build_similar_items_prompt: Step2（類似アイテム検索）用プロンプト

use crate::types::AnalyzedItem;

/// 1アイテムあたりの提案数上限
pub const MAX_SUGGESTIONS_PER_ITEM: usize = 3;

/// Step1プロンプト生成（画像認識用）
pub fn build_analysis_prompt() -> String {
    r#"You are a fashion stylist. Analyze the outfit worn in this image and identify each clothing item and accessory.

## Output format (return ONLY this JSON object)
{
  "identified_clothing": [
    {
      "item_name": "short descriptive name",
      "type": "category such as Top, Bottoms, Outerwear, Shoes, Accessory",
      "color": "main color(s)",
      "material": "material if discernible",
      "pattern": "pattern if any (solid, striped, plaid...)",
      "style_description": "one sentence on cut and style",
      "brand": "brand only if clearly visible",
      "exact_shop_link": "direct product URL only if the exact item is confidently identifiable",
      "exact_price": "price for that exact product if known"
    }
  ],
  "overall_impression": "two or three sentences describing the overall look"
}

## Rules
- List items in the order you detect them, most prominent first
- Omit optional fields you are not sure about instead of guessing
- Never invent shop links or prices
- If no clothing is visible, return an empty "identified_clothing" array"#
        .to_string()
}

/// Step2プロンプト生成（類似アイテム検索用）
///
/// # Arguments
/// * `items` - Step1で識別されたアイテム（検出順）
///
/// # Returns
/// Google検索ツールと併用するプロンプト文字列
pub fn build_similar_items_prompt(items: &[AnalyzedItem]) -> String {
    let item_list = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut line = format!("{}. {} ({})", i + 1, item.search_description(), item.item_type);
            if let Some(style) = item.style_description.as_deref() {
                line.push_str(&format!(" - {}", style));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Search the web for purchasable products that are visually and stylistically similar to each of the following clothing items.

## Items
{item_list}

## Output format (return ONLY this JSON object, no explanation)
{{
  "similar_items_suggestions": [
    {{
      "original_item_query": "the item description exactly as listed above, without the number",
      "suggestions": [
        {{
          "product_name": "product name",
          "shop_link": "direct link to the product page",
          "image_url": "product image URL if available",
          "price_estimate": "price with currency if available"
        }}
      ]
    }}
  ]
}}

## Rules
- Exactly one entry per item, in the same order as the list
- At most {max} suggestions per item; use an empty array when nothing suitable is found
- Only include links you found in search results"#,
        max = MAX_SUGGESTIONS_PER_ITEM,
    )
}
