//! Failure classification
//!
//! Backend calls can fail in many shapes: transport errors from `reqwest`,
//! non-success HTTP statuses, per-attempt timeouts, caller cancellation, or
//! plain strings and JSON blobs surfaced by collaborators. [`Failure`] holds
//! any of those unclassified, and [`classify`] turns it into a
//! [`ServiceError`] with exactly one [`ErrorCode`].
//!
//! Classification is total and never panics. First match wins:
//!
//! 1. abort or timeout signal → `TIMEOUT_ERROR`
//! 2. network / fetch failure markers → `NETWORK_ERROR`
//! 3. HTTP 401 or expired session → `AUTH_ERROR`
//! 4. HTTP 422 or unprocessable payload → `VALIDATION_ERROR`
//! 5. anything else → `SERVER_ERROR` with the original message

use crate::error::{ErrorCode, ServiceError};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Message used when a server error carries no text of its own
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[allow(clippy::expect_used)]
static NETWORK_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)failed to fetch|fetch failed|network",
        r"|connection (refused|reset|closed|aborted)|error sending request|dns error",
    ))
    .expect("network marker pattern is valid")
});

#[allow(clippy::expect_used)]
static AUTH_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)401|session expired|unauthori[sz]ed").expect("auth marker pattern is valid")
});

#[allow(clippy::expect_used)]
static VALIDATION_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)422|unprocessable").expect("validation marker pattern is valid")
});

/// An unclassified failure from a backend call or collaborator
#[derive(Debug)]
pub enum Failure {
    /// The caller cancelled the operation
    Aborted,
    /// A single attempt exceeded its time budget
    TimedOut(Duration),
    /// Transport-level error from the HTTP client
    Transport(reqwest::Error),
    /// The backend answered with a non-success status
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },
    /// A bare message with no further structure
    Message(String),
    /// An arbitrary value; `None` stands for "nothing at all"
    Opaque(Option<serde_json::Value>),
}

impl Failure {
    /// Best-effort text for this failure; `None` when there is nothing to say
    pub fn describe(&self) -> Option<String> {
        match self {
            Failure::Aborted => Some("request aborted".to_string()),
            Failure::TimedOut(limit) => Some(format!("request timed out after {limit:?}")),
            Failure::Transport(e) => Some(e.to_string()),
            Failure::Status { status, body } if body.trim().is_empty() => {
                Some(format!("HTTP {status}"))
            }
            Failure::Status { status, body } => Some(format!("HTTP {status}: {}", body.trim())),
            Failure::Message(msg) => Some(msg.clone()),
            Failure::Opaque(value) => value.as_ref().and_then(describe_value),
        }
        .filter(|text| !text.trim().is_empty())
    }

    /// HTTP status, when the backend produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::Status { status, .. } => Some(*status),
            Failure::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    fn is_abort(&self) -> bool {
        match self {
            Failure::Aborted | Failure::TimedOut(_) => true,
            Failure::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    fn is_connect(&self) -> bool {
        matches!(self, Failure::Transport(e) if e.is_connect())
    }
}

fn describe_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => match map.get("message") {
            Some(serde_json::Value::String(msg)) => Some(msg.clone()),
            _ => Some(value.to_string()),
        },
        other => Some(other.to_string()),
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.describe() {
            Some(text) => f.write_str(&text),
            None => f.write_str("unknown failure"),
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Failure::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        Failure::Transport(err)
    }
}

impl From<String> for Failure {
    fn from(msg: String) -> Self {
        Failure::Message(msg)
    }
}

impl From<&str> for Failure {
    fn from(msg: &str) -> Self {
        Failure::Message(msg.to_string())
    }
}

/// User-facing message for a taxonomy code
///
/// Server errors have no canned message; they carry the original text.
pub fn user_message(code: ErrorCode) -> Option<&'static str> {
    match code {
        ErrorCode::Auth => Some("Session expired. Please log in again."),
        ErrorCode::Network => Some("Network error. Please check your connection and try again."),
        ErrorCode::Timeout => Some("Request timed out. The server took too long to respond."),
        ErrorCode::Validation => {
            Some("Invalid request. Please check the article data and try again.")
        }
        ErrorCode::Server => None,
    }
}

/// Classify a raw failure into the service taxonomy
pub fn classify(failure: Failure) -> ServiceError {
    let code = classify_code(&failure);
    let message = match user_message(code) {
        Some(canned) => canned.to_string(),
        None => failure
            .describe()
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
    };

    ServiceError {
        message,
        code,
        original: Some(failure),
    }
}

fn classify_code(failure: &Failure) -> ErrorCode {
    if failure.is_abort() {
        return ErrorCode::Timeout;
    }

    let text = failure.describe().unwrap_or_default();
    let status = failure.status();

    if failure.is_connect() || NETWORK_MARKERS.is_match(&text) {
        ErrorCode::Network
    } else if status == Some(401) || AUTH_MARKERS.is_match(&text) {
        ErrorCode::Auth
    } else if status == Some(422) || VALIDATION_MARKERS.is_match(&text) {
        ErrorCode::Validation
    } else {
        ErrorCode::Server
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aborts_and_timeouts_classify_as_timeout() {
        assert_eq!(classify(Failure::Aborted).code, ErrorCode::Timeout);
        assert_eq!(
            classify(Failure::TimedOut(Duration::from_secs(30))).code,
            ErrorCode::Timeout
        );
    }

    #[test]
    fn network_markers_classify_as_network() {
        for msg in [
            "Failed to fetch",
            "TypeError: fetch failed",
            "NetworkError when attempting to fetch resource",
            "connection refused by peer",
        ] {
            let err = classify(Failure::from(msg));
            assert_eq!(err.code, ErrorCode::Network, "{msg}");
            assert_eq!(err.message, user_message(ErrorCode::Network).unwrap());
        }
    }

    #[test]
    fn unauthorized_markers_classify_as_auth() {
        for msg in ["HTTP 401", "Session expired", "request returned 401 Unauthorized"] {
            assert_eq!(classify(Failure::from(msg)).code, ErrorCode::Auth, "{msg}");
        }

        let status = Failure::Status {
            status: 401,
            body: String::new(),
        };
        assert_eq!(classify(status).code, ErrorCode::Auth);
    }

    #[test]
    fn unprocessable_markers_classify_as_validation() {
        assert_eq!(
            classify(Failure::from("HTTP 422: missing category")).code,
            ErrorCode::Validation
        );
        assert_eq!(
            classify(Failure::from("Unprocessable entity")).code,
            ErrorCode::Validation
        );
        let status = Failure::Status {
            status: 422,
            body: "{\"detail\":\"bad\"}".into(),
        };
        assert_eq!(classify(status).code, ErrorCode::Validation);
    }

    #[test]
    fn network_markers_win_over_auth_markers() {
        // first match wins: a network failure mentioning 401 is still a network failure
        let err = classify(Failure::from("network error while refreshing 401 session"));
        assert_eq!(err.code, ErrorCode::Network);
    }

    #[test]
    fn unrecognized_failures_keep_their_message_verbatim() {
        let err = classify(Failure::Status {
            status: 500,
            body: "model overloaded".into(),
        });
        assert_eq!(err.code, ErrorCode::Server);
        assert_eq!(err.message, "HTTP 500: model overloaded");

        let err = classify(Failure::from("something odd happened"));
        assert_eq!(err.code, ErrorCode::Server);
        assert_eq!(err.message, "something odd happened");
    }

    #[test]
    fn shapeless_values_classify_without_panicking() {
        let undefined = classify(Failure::Opaque(None));
        assert_eq!(undefined.code, ErrorCode::Server);
        assert_eq!(undefined.message, GENERIC_ERROR_MESSAGE);

        let null = classify(Failure::Opaque(Some(json!(null))));
        assert_eq!(null.message, GENERIC_ERROR_MESSAGE);

        let blank = classify(Failure::from("   "));
        assert_eq!(blank.message, GENERIC_ERROR_MESSAGE);

        let object = classify(Failure::Opaque(Some(json!({"message": "Session expired"}))));
        assert_eq!(object.code, ErrorCode::Auth);

        let other = classify(Failure::Opaque(Some(json!({"reason": "quota"}))));
        assert_eq!(other.code, ErrorCode::Server);
        assert_eq!(other.message, r#"{"reason":"quota"}"#);

        let number = classify(Failure::Opaque(Some(json!(42))));
        assert_eq!(number.message, "42");
    }

    #[test]
    fn classified_error_keeps_original_failure() {
        let err = classify(Failure::from("kaput"));
        assert!(matches!(err.original, Some(Failure::Message(ref m)) if m == "kaput"));
    }
}
