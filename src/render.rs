//! ターミナル表示
//!
//! スナップショットをそのまま文字列にするだけで、状態は持たない

use std::fmt::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{FinderError, Result};
use crate::runner::SessionHandle;
use fashion_finder_common::{
    GroundingChunk, OutfitAnalysisResult, SessionSnapshot, SimilarItemsSearchResult,
};

/// 読み込み中の表示文言
pub fn loading_message(snapshot: &SessionSnapshot) -> Option<&'static str> {
    if snapshot.is_analyzing {
        Some("Analyzing your outfit...")
    } else if snapshot.is_searching {
        Some("Searching for similar items...")
    } else {
        None
    }
}

pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "⚠ Error: {}", error);
        out.push('\n');
    }

    if let Some(analysis) = snapshot.analysis.as_ref().filter(|_| snapshot.shows_analysis()) {
        out.push_str(&render_analysis(analysis));
    }

    if let Some(search) = snapshot.search_result.as_ref().filter(|_| snapshot.shows_search_result()) {
        out.push('\n');
        out.push_str(&render_similar_items(search, snapshot.grounding_sources.as_deref()));
    }

    out
}

pub fn render_analysis(analysis: &OutfitAnalysisResult) -> String {
    let mut out = String::from("👗 Outfit analysis\n");

    if !analysis.overall_impression.trim().is_empty() {
        let _ = writeln!(out, "  {}", analysis.overall_impression.trim());
    }

    if !analysis.has_items() {
        out.push_str("  No clothing items were identified.\n");
        return out;
    }

    for (i, item) in analysis.identified_clothing.iter().enumerate() {
        let _ = writeln!(out, "  {}. {} ({}, {})", i + 1, item.item_name, item.item_type, item.color);

        let details: Vec<&str> = [&item.brand, &item.material, &item.pattern]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .filter(|v| !v.trim().is_empty())
            .collect();
        if !details.is_empty() {
            let _ = writeln!(out, "     {}", details.join(" / "));
        }
        if let Some(style) = &item.style_description {
            let _ = writeln!(out, "     {}", style);
        }
        if let Some(link) = &item.exact_shop_link {
            match &item.exact_price {
                Some(price) => {
                    let _ = writeln!(out, "     Shop: {} ({})", link, price);
                }
                None => {
                    let _ = writeln!(out, "     Shop: {}", link);
                }
            }
        }
    }

    out
}

pub fn render_similar_items(
    search: &SimilarItemsSearchResult,
    sources: Option<&[GroundingChunk]>,
) -> String {
    let mut out = String::from("🛍 Similar items\n");

    for group in &search.similar_items_suggestions {
        let _ = writeln!(out, "  For \"{}\":", group.original_item_query);
        if group.suggestions.is_empty() {
            out.push_str("    (no suggestions found)\n");
        }
        for s in &group.suggestions {
            match &s.price_estimate {
                Some(price) => {
                    let _ = writeln!(out, "    - {} ({}) {}", s.product_name, price, s.shop_link);
                }
                None => {
                    let _ = writeln!(out, "    - {} {}", s.product_name, s.shop_link);
                }
            }
        }
    }

    let web_sources: Vec<_> = sources
        .unwrap_or_default()
        .iter()
        .filter_map(|c| c.web.as_ref())
        .collect();
    if !web_sources.is_empty() {
        out.push_str("  Sources:\n");
        for web in web_sources {
            let title = if web.title.trim().is_empty() { &web.uri } else { &web.title };
            let _ = writeln!(out, "    - {}: {}", title, web.uri);
        }
    }

    out
}

/// スピナーを出しながらセッションが落ち着くのを待つ
pub async fn wait_with_spinner(handle: &SessionHandle) -> Result<SessionSnapshot> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut updates = handle.subscribe();
    let settled = handle.settled();
    tokio::pin!(settled);

    loop {
        let message = {
            let update = updates.borrow();
            if update.acquiring {
                Some("Getting your image...")
            } else {
                loading_message(&update.snapshot)
            }
        };
        if let Some(message) = message {
            spinner.set_message(message);
        }

        tokio::select! {
            result = &mut settled => {
                spinner.finish_and_clear();
                return result;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    spinner.finish_and_clear();
                    return Err(FinderError::SessionClosed);
                }
            }
        }
    }
}
