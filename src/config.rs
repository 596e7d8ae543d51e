//! Configuration types for newsfeed-client

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the API clients
///
/// Every field has a default, so `ClientConfig::default()` talks to a backend
/// on `localhost:8000` with the standard retry policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL (default: "http://localhost:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Public site URL used to build article links (default: "http://localhost:3000")
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP connect timeout (default: 10 seconds)
    #[serde(
        default = "default_connect_timeout",
        with = "duration_serde",
        rename = "connect_timeout_ms"
    )]
    pub connect_timeout: Duration,

    /// Buffer size of the event channel (default: 100)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Retry policy for backend calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Chat-specific behavior
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            public_base_url: default_public_base_url(),
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
            event_capacity: default_event_capacity(),
            retry: RetryConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

/// Largest accepted `retry.backoff_multiplier`
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

impl ClientConfig {
    /// Parse a JSON configuration document and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        validate_http_url(&self.base_url, "base_url")?;
        validate_http_url(&self.public_base_url, "public_base_url")?;

        let multiplier = self.retry.backoff_multiplier;
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&multiplier) {
            return Err(Error::Config {
                message: format!(
                    "backoff multiplier must be in 1.0..={MAX_BACKOFF_MULTIPLIER}, got {multiplier}"
                ),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }

        if self.retry.attempt_timeout.is_zero() {
            return Err(Error::Config {
                message: "attempt timeout must be greater than zero".to_string(),
                key: Some("retry.attempt_timeout_ms".to_string()),
            });
        }

        if self.event_capacity == 0 {
            return Err(Error::Config {
                message: "event channel capacity must be greater than zero".to_string(),
                key: Some("event_capacity".to_string()),
            });
        }

        Ok(())
    }
}

fn validate_http_url(raw: &str, key: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw).map_err(|e| Error::Config {
        message: format!("invalid URL {raw:?}: {e}"),
        key: Some(key.to_string()),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::Config {
            message: format!("unsupported URL scheme {other:?} (expected http or https)"),
            key: Some(key.to_string()),
        }),
    }
}

/// Retry behavior for transient failures
///
/// The delay after the n-th failed attempt is
/// `initial_delay * backoff_multiplier^(n-1)`, capped at `max_delay`.
/// With the defaults that is 2s, 4s, 8s.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 3; 0 behaves like 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt (default: 2 seconds)
    #[serde(
        default = "default_initial_delay",
        with = "duration_serde",
        rename = "initial_delay_ms"
    )]
    pub initial_delay: Duration,

    /// Maximum delay between attempts (default: 8 seconds)
    #[serde(
        default = "default_max_delay",
        with = "duration_serde",
        rename = "max_delay_ms"
    )]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,

    /// Time budget for a single attempt (default: 30 seconds)
    #[serde(
        default = "default_attempt_timeout",
        with = "duration_serde",
        rename = "attempt_timeout_ms"
    )]
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
            attempt_timeout: default_attempt_timeout(),
        }
    }
}

impl RetryConfig {
    /// Same policy, different attempt budget
    pub fn with_max_attempts(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self.clone()
        }
    }
}

/// Chat endpoint behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Require a session token for chat (default: true)
    #[serde(default = "default_true")]
    pub require_auth: bool,

    /// Attempts per chat message (default: 1, no retries)
    #[serde(default = "default_chat_attempts")]
    pub max_attempts: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            max_attempts: default_chat_attempts(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_user_agent() -> String {
    format!("newsfeed-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_event_capacity() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(8)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_chat_attempts() -> u32 {
    1
}

// Durations travel as integer milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
