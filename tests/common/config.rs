//! Client construction against mock servers

use newsfeed_client::{
    ApiBackend, ClientConfig, MemoryTokenStore, RetryConfig, SessionCache, SessionHandle,
    SystemClock, TokenProvider,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Retry policy with the default shape but millisecond delays
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        backoff_multiplier: 2.0,
        jitter: false,
        attempt_timeout: Duration::from_secs(2),
    }
}

/// Config pointed at `base_url` with fast retries
pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        public_base_url: "https://news.example.com".to_string(),
        retry: fast_retry(),
        ..ClientConfig::default()
    }
}

/// Backend with an in-memory token store holding `token` (if any)
pub fn backend(base_url: &str, token: Option<&str>) -> (ApiBackend, Arc<MemoryTokenStore>) {
    backend_with_config(test_config(base_url), token)
}

/// Backend over an explicit config, with an in-memory token store
pub fn backend_with_config(
    config: ClientConfig,
    token: Option<&str>,
) -> (ApiBackend, Arc<MemoryTokenStore>) {
    let tokens = Arc::new(match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    });
    let provider: Arc<dyn TokenProvider> = tokens.clone();
    let backend = ApiBackend::new(config, provider).expect("valid test config");
    (backend, tokens)
}

/// Fresh cache bound to `session`
pub fn cache(session: &SessionHandle) -> Arc<SessionCache> {
    Arc::new(SessionCache::new(session.clone(), Arc::new(SystemClock)))
}

/// Base URL of a local port with nothing listening on it
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// Local server that accepts connections and drops them without replying
///
/// Returns the base URL and a count of accepted connections.
pub async fn dropping_server() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    (format!("http://127.0.0.1:{port}"), accepted)
}
