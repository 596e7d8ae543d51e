//! Degraded summaries for when enhancement fails
//!
//! The UI must never receive an empty or malformed summary, even when the
//! enhancement backend is completely unavailable. [`build_fallback`]
//! synthesizes one from the article itself. Output depends only on the
//! inputs, so the same article always degrades to the same response.

use crate::types::{Article, EnhancedSummaryResponse};

/// Confidence reported for every synthesized response
pub const FALLBACK_CONFIDENCE: u8 = 50;

/// Reading time used when the article does not carry one
pub const DEFAULT_READING_TIME: &str = "2 min read";

const DEFAULT_ERROR: &str = "Enhancement service unavailable";

/// Build a degraded response from the article's own content
///
/// Always `success: false` with a confidence of [`FALLBACK_CONFIDENCE`].
/// The article's original summary is embedded verbatim.
pub fn build_fallback(article: &Article, error_message: Option<&str>) -> EnhancedSummaryResponse {
    let category = category_label(article);
    let source = source_label(article);

    let original = if article.summary.trim().is_empty() {
        article.title.trim()
    } else {
        article.summary.as_str()
    };

    let explanation = format!(
        "This {category} story is shown as originally reported because the detailed analysis \
         could not be generated right now. The summary above comes directly from {source}; \
         check back later for expanded coverage."
    );

    let enhanced_summary = if original.is_empty() {
        explanation
    } else {
        format!("{original}\n\n{explanation}")
    };

    let key_points = vec![
        format!("Latest development in {category} news"),
        "Details are based on the original report".to_string(),
        format!("Further {category} analysis will follow once the service recovers"),
        "Consult the full article for complete context".to_string(),
    ];

    let context = format!(
        "Originally reported by {source}. Additional background for this {category} story \
         is temporarily unavailable."
    );

    let error = error_message
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
        .unwrap_or(DEFAULT_ERROR)
        .to_string();

    EnhancedSummaryResponse {
        success: false,
        enhanced_summary,
        key_points,
        context,
        reading_time: reading_time_for(article),
        confidence_score: FALLBACK_CONFIDENCE,
        error: Some(error),
    }
}

/// Context string for a successful response whose backend omitted one
pub fn backfill_context(article: &Article) -> String {
    format!(
        "This article covers recent developments in {}. Reported by {}.",
        category_label(article),
        source_label(article)
    )
}

/// Reading time from the article, or [`DEFAULT_READING_TIME`]
pub fn reading_time_for(article: &Article) -> String {
    article
        .reading_time
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_READING_TIME)
        .to_string()
}

fn category_label(article: &Article) -> &str {
    match article.category.trim() {
        "" => "general",
        category => category,
    }
}

fn source_label(article: &Article) -> &str {
    match article.source.trim() {
        "" => "the original publisher",
        source => source,
    }
}
