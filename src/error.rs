//! Error types for newsfeed-client
//!
//! This module provides the error handling for the library:
//! - The crate-level [`Error`] returned by every fallible operation
//! - The closed service taxonomy ([`ErrorCode`]) that every backend failure maps onto
//! - [`ServiceError`], a classified failure carrying its original cause

use crate::classify::Failure;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for newsfeed-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for newsfeed-client
///
/// Only conditions that need user-visible action reach callers as `Err`:
/// a missing session, a malformed request built by the calling code, or a
/// read that failed after retries. Enhancement and chat failures are absorbed
/// into degraded responses instead.
#[derive(Debug, Error)]
pub enum Error {
    /// No authentication token is available for a call that requires one
    #[error("Authentication required. Please log in to continue.")]
    AuthRequired,

    /// A field required by the backend contract is missing or blank
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field (e.g. "title")
        field: &'static str,
    },

    /// A backend call failed and was classified
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// I/O error (persistent token storage)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Map any crate error onto the service taxonomy
    ///
    /// Lets a UI render every failure with the same small set of states.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::AuthRequired => ErrorCode::Auth,
            Error::MissingField { .. } => ErrorCode::Validation,
            Error::Service(e) => e.code,
            Error::Config { .. }
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::InvalidUrl(_)
            | Error::Http(_) => ErrorCode::Server,
        }
    }

    /// Whether this error means the user has to sign in again
    pub fn requires_login(&self) -> bool {
        self.code() == ErrorCode::Auth
    }
}

/// Closed taxonomy of service failures
///
/// Every failure maps to exactly one code; unrecognized failures land in
/// [`ErrorCode::Server`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Session invalid or expired; terminal, triggers logout
    #[serde(rename = "AUTH_ERROR")]
    Auth,
    /// Connection-level failure; transient
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    /// Anything unrecognized, including backend 5xx; retried
    #[serde(rename = "SERVER_ERROR")]
    Server,
    /// Attempt timed out or was aborted; transient
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    /// Request rejected as malformed; terminal
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
}

impl ErrorCode {
    /// Wire name of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Auth => "AUTH_ERROR",
            ErrorCode::Network => "NETWORK_ERROR",
            ErrorCode::Server => "SERVER_ERROR",
            ErrorCode::Timeout => "TIMEOUT_ERROR",
            ErrorCode::Validation => "VALIDATION_ERROR",
        }
    }

    /// Terminal codes short-circuit the retry loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, ErrorCode::Auth | ErrorCode::Validation)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified backend failure
///
/// Produced by [`classify`](crate::classify::classify). `message` is safe to
/// show to users; `original` keeps the raw failure for logs and is exposed
/// through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ServiceError {
    /// Human-readable message
    pub message: String,
    /// Taxonomy code
    pub code: ErrorCode,
    /// The raw failure this error was classified from
    #[source]
    pub original: Option<Failure>,
}

impl ServiceError {
    /// Create a service error without an underlying failure
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            original: None,
        }
    }
}
