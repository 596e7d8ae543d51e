//! Core types and events

use crate::error::ErrorCode;
use serde::{Deserialize, Deserializer, Serialize};

/// A news article as delivered by the backend
///
/// Treated as an immutable value once received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Article ID (the backend sends either a string or a number)
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Headline
    pub title: String,
    /// Short summary or snippet
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: String,
    /// Category name (e.g. "sports")
    pub category: String,
    /// Publication time as sent by the backend
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timestamp: String,
    /// Publisher name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source: String,
    /// Breaking-news flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking: Option<bool>,
    /// Canonical article URL, when the backend knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Estimated reading time (e.g. "3 min read")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<String>,
}

impl Article {
    /// Minimal article with the fields the enhancement contract requires
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: summary.into(),
            category: category.into(),
            timestamp: String::new(),
            source: String::new(),
            breaking: None,
            url: None,
            reading_time: None,
        }
    }

    /// Whether the article is flagged as breaking news
    pub fn is_breaking(&self) -> bool {
        self.breaking.unwrap_or(false)
    }
}

/// Backends send `null` for text they do not have
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Enhanced summary handed to the UI
///
/// When `success` is false the response is a locally synthesized fallback:
/// `confidence_score` is at most 50 and `enhanced_summary` is never blank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnhancedSummaryResponse {
    /// Whether the backend produced the enhancement
    pub success: bool,
    /// Rewritten summary
    pub enhanced_summary: String,
    /// Bullet points, in display order
    pub key_points: Vec<String>,
    /// Background context for the story
    pub context: String,
    /// Estimated reading time
    pub reading_time: String,
    /// Confidence from 0 to 100
    pub confidence_score: u8,
    /// Why the enhancement was degraded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /api/article/enhance-summary`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnhanceSummaryRequest {
    /// Article ID
    pub article_id: String,
    /// Public article URL
    pub article_url: String,
    /// Headline
    pub article_title: String,
    /// Summary or snippet
    pub article_snippet: String,
    /// Category name
    pub category: String,
}

/// Body of `POST /api/article/chat`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    pub message: String,
    /// Article the question is about
    pub article_id: String,
    /// Headline, for backend context
    pub article_title: String,
    /// Summary, for backend context
    pub article_summary: String,
    /// Category name
    pub category: String,
}

/// Chat answer handed to the UI
///
/// Always carries something displayable in `response`, even on failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Whether the backend answered
    pub success: bool,
    /// Answer text, or an apology when the backend could not answer
    pub response: String,
    /// Failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Event emitted by the API layer
///
/// Subscribers receive these over a broadcast channel; see
/// [`ApiBackend::subscribe`](crate::client::ApiBackend::subscribe).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A call needed a session but no token was present
    AuthRequired {
        /// What was being attempted
        reason: String,
    },

    /// The backend rejected the token; the local session was cleared
    SessionExpired,

    /// Enhancement failed and a fallback summary was served instead
    FallbackServed {
        /// Article ID
        article_id: String,
        /// Classified failure
        code: ErrorCode,
    },
}
