//! Retry logic with exponential backoff
//!
//! Backend calls are attempted up to `max_attempts` times. Every failure is
//! classified first; terminal classes (`AUTH_ERROR`, `VALIDATION_ERROR`) are
//! returned immediately because retrying cannot fix them. Transient classes
//! wait out an exponential backoff and try again.
//!
//! Each attempt runs under `attempt_timeout`. When the budget elapses the
//! attempt future is dropped, which cancels the in-flight request and its
//! timer together.
//!
//! # Example
//!
//! ```no_run
//! use newsfeed_client::classify::Failure;
//! use newsfeed_client::config::RetryConfig;
//! use newsfeed_client::retry::with_retry;
//!
//! # async fn example() -> Result<(), newsfeed_client::ServiceError> {
//! let config = RetryConfig::default();
//! let body = with_retry(&config, "ping", || async {
//!     // Your operation here
//!     Ok::<_, Failure>("pong".to_string())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::classify::{Failure, classify};
use crate::config::RetryConfig;
use crate::error::{ErrorCode, ServiceError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network, timeouts, server errors) should return `true`.
/// Permanent failures (authentication, malformed requests) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for ErrorCode {
    fn is_retryable(&self) -> bool {
        !self.is_terminal()
    }
}

impl IsRetryable for ServiceError {
    fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// Execute an async operation with bounded retries and exponential backoff
///
/// # Arguments
///
/// * `config` - Retry configuration (attempts, delays, multiplier, jitter, attempt timeout)
/// * `context` - Short label for logs (e.g. "enhance-summary")
/// * `operation` - Closure producing a fresh attempt each time it is called
///
/// # Returns
///
/// The first successful result, or the classified error of the last attempt.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    context: &str,
    operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    run(config, context, None, operation).await
}

/// Like [`with_retry`], but stops as soon as `cancel` fires
///
/// Cancellation during an attempt or during backoff ends the loop with a
/// `TIMEOUT_ERROR`; no further attempts are made.
pub async fn with_retry_cancellable<F, Fut, T>(
    config: &RetryConfig,
    context: &str,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    run(config, context, Some(cancel), operation).await
}

async fn run<F, Fut, T>(
    config: &RetryConfig,
    context: &str,
    cancel: Option<&CancellationToken>,
    mut operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        let outcome = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(Failure::Aborted),
                result = bounded(config.attempt_timeout, operation()) => result,
            },
            None => bounded(config.attempt_timeout, operation()).await,
        };

        let failure = match outcome {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(context, attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(failure) => failure,
        };

        let cancelled = matches!(failure, Failure::Aborted);
        let error = classify(failure);

        if cancelled {
            tracing::warn!(context, attempt, "Operation cancelled by caller");
            return Err(error);
        }

        if !error.is_retryable() {
            tracing::error!(
                context,
                code = %error.code,
                error = %error,
                "Operation failed with non-retryable error"
            );
            return Err(error);
        }

        if attempt >= max_attempts {
            tracing::error!(
                context,
                code = %error.code,
                error = %error,
                attempts = attempt,
                "Operation failed after all retry attempts exhausted"
            );
            return Err(error);
        }

        let wait = if config.jitter {
            add_jitter(delay)
        } else {
            delay
        };

        tracing::warn!(
            context,
            code = %error.code,
            error = %error,
            attempt,
            max_attempts,
            delay_ms = wait.as_millis() as u64,
            "Operation failed, retrying"
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::warn!(context, attempt, "Operation cancelled during backoff");
                        return Err(classify(Failure::Aborted));
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            None => tokio::time::sleep(wait).await,
        }

        let next_delay =
            Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                .unwrap_or(config.max_delay);
        delay = next_delay.min(config.max_delay);
    }
}

async fn bounded<Fut, T>(limit: Duration, attempt: Fut) -> Result<T, Failure>
where
    Fut: Future<Output = Result<T, Failure>>,
{
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(Failure::TimedOut(limit)),
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}
