//! Article enhancement and article chat.
//!
//! `get_enhanced_summary` only returns `Err` for conditions that need user or
//! developer action: no session, a rejected session, or an article missing
//! required fields. Every other failure resolves to a fallback summary.

use super::ApiBackend;
use crate::error::{Error, ErrorCode, Result, ServiceError};
use crate::fallback::{backfill_context, build_fallback, reading_time_for};
use crate::retry::{with_retry, with_retry_cancellable};
use crate::types::{
    Article, ChatReply, ChatRequest, EnhanceSummaryRequest, EnhancedSummaryResponse, Event,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const ENHANCE_PATH: &str = "api/article/enhance-summary";
const CHAT_PATH: &str = "api/article/chat";

/// Confidence assumed when the backend does not report one
const DEFAULT_CONFIDENCE: u8 = 75;

const CHAT_APOLOGY: &str =
    "I'm sorry, I couldn't answer that right now. Please try asking again in a moment.";

/// Enhancement response as the backend sends it; every field may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnhancementPayload {
    success: Option<bool>,
    enhanced_summary: Option<String>,
    key_points: Option<Vec<String>>,
    context: Option<String>,
    reading_time: Option<String>,
    confidence_score: Option<f64>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatPayload {
    success: Option<bool>,
    response: Option<String>,
    error: Option<String>,
}

/// Client for AI summary enhancement and article chat
#[derive(Clone)]
pub struct ArticleEnhancementClient {
    backend: ApiBackend,
}

impl ArticleEnhancementClient {
    /// Create a client over a shared backend
    pub fn new(backend: ApiBackend) -> Self {
        Self { backend }
    }

    /// The shared backend
    pub fn backend(&self) -> &ApiBackend {
        &self.backend
    }

    /// Fetch an enhanced summary for `article`
    ///
    /// # Errors
    ///
    /// - [`Error::AuthRequired`] when no session token is present (no request is sent)
    /// - [`Error::MissingField`] when `id`, `title`, or `category` is blank (no request is sent)
    /// - [`Error::Service`] with `AUTH_ERROR` when the backend rejects the session
    ///
    /// Any other failure, after retries, yields a fallback response with
    /// `success: false`.
    pub async fn get_enhanced_summary(&self, article: &Article) -> Result<EnhancedSummaryResponse> {
        self.enhance(article, None).await
    }

    /// [`get_enhanced_summary`](Self::get_enhanced_summary) that stops when `cancel` fires
    ///
    /// A cancelled call resolves to the fallback response.
    pub async fn get_enhanced_summary_cancellable(
        &self,
        article: &Article,
        cancel: &CancellationToken,
    ) -> Result<EnhancedSummaryResponse> {
        self.enhance(article, Some(cancel)).await
    }

    async fn enhance(
        &self,
        article: &Article,
        cancel: Option<&CancellationToken>,
    ) -> Result<EnhancedSummaryResponse> {
        let token = self.backend.require_token("enhance article summary")?;
        let request = self.build_request(article)?;
        let url = self.backend.endpoint(ENHANCE_PATH)?;
        let retry = &self.backend.config().retry;

        let attempt = || {
            let backend = self.backend.clone();
            let url = url.clone();
            let token = token.clone();
            let request = request.clone();
            async move {
                backend
                    .post_json::<_, EnhancementPayload>(url, Some(&token), &request)
                    .await
            }
        };

        let outcome = match cancel {
            Some(cancel) => with_retry_cancellable(retry, "enhance-summary", cancel, attempt).await,
            None => with_retry(retry, "enhance-summary", attempt).await,
        };

        match outcome {
            Ok(payload) => Ok(self.complete(article, payload)),
            Err(error) if error.code == ErrorCode::Auth => Err(Error::Service(error)),
            Err(error) => Ok(self.degrade(article, &error)),
        }
    }

    fn build_request(&self, article: &Article) -> Result<EnhanceSummaryRequest> {
        let article_id = required(&article.id, "id")?;
        let article_title = required(&article.title, "title")?;
        let category = required(&article.category, "category")?;

        let article_url = match article.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!(
                "{}/article/{}",
                self.backend.config().public_base_url.trim_end_matches('/'),
                urlencoding::encode(&article_id)
            ),
        };

        Ok(EnhanceSummaryRequest {
            article_id,
            article_url,
            article_title,
            article_snippet: article.summary.clone(),
            category,
        })
    }

    /// Turn a backend answer into the response contract
    fn complete(&self, article: &Article, payload: EnhancementPayload) -> EnhancedSummaryResponse {
        let summary = payload
            .enhanced_summary
            .filter(|summary| !summary.trim().is_empty());

        let enhanced_summary = match (payload.success, summary) {
            (Some(false), _) | (_, None) => {
                let reason = payload
                    .error
                    .unwrap_or_else(|| "Enhancement returned no summary".to_string());
                let error = ServiceError::new(ErrorCode::Server, reason);
                return self.degrade(article, &error);
            }
            (_, Some(summary)) => summary,
        };

        let context = match payload.context.filter(|c| !c.trim().is_empty()) {
            Some(context) => context,
            None => {
                tracing::debug!(article_id = %article.id, "Backend omitted context, backfilling");
                backfill_context(article)
            }
        };

        let reading_time = payload
            .reading_time
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| reading_time_for(article));

        let confidence_score = payload
            .confidence_score
            .map(|score| score.clamp(0.0, 100.0).round() as u8)
            .unwrap_or(DEFAULT_CONFIDENCE);

        EnhancedSummaryResponse {
            success: true,
            enhanced_summary,
            key_points: payload.key_points.unwrap_or_default(),
            context,
            reading_time,
            confidence_score,
            error: None,
        }
    }

    fn degrade(&self, article: &Article, error: &ServiceError) -> EnhancedSummaryResponse {
        tracing::info!(
            article_id = %article.id,
            code = %error.code,
            error = %error,
            "Serving fallback summary"
        );
        self.backend.emit(Event::FallbackServed {
            article_id: article.id.clone(),
            code: error.code,
        });
        build_fallback(article, Some(&error.message))
    }

    /// Ask a question about `article`
    ///
    /// Failures come back as a reply with `success: false` and an apology in
    /// `response`. Only a missing or rejected session (when chat requires
    /// one) and a blank message are returned as errors.
    pub async fn send_chat_message(&self, message: &str, article: &Article) -> Result<ChatReply> {
        let chat = &self.backend.config().chat;
        let token = if chat.require_auth {
            Some(self.backend.require_token("chat about article")?)
        } else {
            self.backend.current_token()
        };

        let message = message.trim();
        if message.is_empty() {
            return Err(Error::MissingField { field: "message" });
        }

        let request = ChatRequest {
            message: message.to_string(),
            article_id: article.id.clone(),
            article_title: article.title.clone(),
            article_summary: article.summary.clone(),
            category: article.category.clone(),
        };
        let url = self.backend.endpoint(CHAT_PATH)?;
        let retry = self.backend.config().retry.with_max_attempts(chat.max_attempts);

        let outcome = with_retry(&retry, "article-chat", || {
            let backend = self.backend.clone();
            let url = url.clone();
            let token = token.clone();
            let request = request.clone();
            async move {
                backend
                    .post_json::<_, ChatPayload>(url, token.as_deref(), &request)
                    .await
            }
        })
        .await;

        match outcome {
            Ok(payload) => {
                let answer = payload.response.filter(|r| !r.trim().is_empty());
                match (payload.success, answer) {
                    (Some(false), _) | (_, None) => Ok(apology(
                        payload
                            .error
                            .unwrap_or_else(|| "Chat returned no answer".to_string()),
                    )),
                    (_, Some(response)) => Ok(ChatReply {
                        success: true,
                        response,
                        error: None,
                    }),
                }
            }
            Err(error) if error.code == ErrorCode::Auth && chat.require_auth => {
                Err(Error::Service(error))
            }
            Err(error) => {
                tracing::info!(
                    article_id = %article.id,
                    code = %error.code,
                    "Chat failed, replying with apology"
                );
                Ok(apology(error.message))
            }
        }
    }
}

fn apology(error: String) -> ChatReply {
    ChatReply {
        success: false,
        response: CHAT_APOLOGY.to_string(),
        error: Some(error),
    }
}

fn required(value: &str, field: &'static str) -> Result<String> {
    match value.trim() {
        "" => Err(Error::MissingField { field }),
        value => Ok(value.to_string()),
    }
}
