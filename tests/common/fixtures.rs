//! Articles and backend payloads

use newsfeed_client::Article;
use serde_json::{Value, json};

/// The sports article used across the enhancement scenarios
pub fn sports_article() -> Article {
    let mut article = Article::new("a1", "X", "Y", "sports");
    article.source = "Daily Planet".to_string();
    article
}

/// Successful enhancement body without a `context` field
pub fn enhancement_without_context() -> Value {
    json!({
        "success": true,
        "enhanced_summary": "Z",
        "key_points": [],
        "reading_time": "2 min",
        "confidence_score": 90
    })
}

/// Complete successful enhancement body
pub fn enhancement_body() -> Value {
    json!({
        "success": true,
        "enhanced_summary": "The home side came back from two down to win the cup.",
        "key_points": ["Comeback from 0-2", "First cup in a decade"],
        "context": "The club last won the cup in 2014.",
        "reading_time": "3 min read",
        "confidence_score": 88
    })
}

/// Dashboard listing body for `/api/news/all`
pub fn all_news_body() -> Value {
    json!({
        "sports": [
            {"id": "a1", "title": "X", "summary": "Y", "category": "sports", "breaking": true}
        ],
        "tech": [
            {"id": 7, "title": "Chips", "summary": "Smaller again", "category": "tech"}
        ]
    })
}

/// Category listing body
pub fn category_body(category: &str) -> Value {
    json!([
        {"id": format!("{category}-1"), "title": "First", "summary": "One", "category": category},
        {"id": format!("{category}-2"), "title": "Second", "summary": "Two", "category": category}
    ])
}
