//! # newsfeed-client
//!
//! Resilient client for a news dashboard backend: AI-enhanced article
//! summaries, article chat, and category listings.
//!
//! ## Design Philosophy
//!
//! newsfeed-client is designed to be:
//! - **Never empty-handed** - Enhancement failures degrade to a synthesized summary
//! - **Uniform errors** - Every failure is classified into one of five codes
//! - **Session-scoped caching** - The dashboard listing lives exactly as long as the session
//! - **Event-driven** - Login prompts and session expiry are broadcast, not polled
//!
//! ## Quick Start
//!
//! ```no_run
//! use newsfeed_client::{
//!     ApiBackend, Article, ArticleEnhancementClient, ClientConfig, MemoryTokenStore,
//!     NewsFetchClient, SessionCache, SessionHandle, SystemClock,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig {
//!         base_url: "https://api.news.example.com".to_string(),
//!         ..Default::default()
//!     };
//!     let backend = ApiBackend::new(config, Arc::new(MemoryTokenStore::with_token("jwt")))?;
//!
//!     // Subscribe to events
//!     let mut events = backend.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let cache = Arc::new(SessionCache::new(SessionHandle::generate(), Arc::new(SystemClock)));
//!     let news = NewsFetchClient::new(backend.clone(), cache);
//!     let listing = news.get_all_news().await?;
//!
//!     let enhancer = ArticleEnhancementClient::new(backend);
//!     if let Some(article) = listing.values().flatten().next() {
//!         let summary = enhancer.get_enhanced_summary(article).await?;
//!         println!("{} ({}% confidence)", summary.enhanced_summary, summary.confidence_score);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Session-scoped listing cache
pub mod cache;
/// Failure classification
pub mod classify;
/// Backend API clients
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Fallback summary synthesis
pub mod fallback;
/// Retry logic with exponential backoff
pub mod retry;
/// Tokens, session identity, and environment probes
pub mod session;
/// Wire types and events
pub mod types;

// Re-export commonly used types
pub use cache::{CacheEntry, NewsByCategory, SessionCache};
pub use classify::{Failure, classify};
pub use client::{ApiBackend, ArticleEnhancementClient, NewsFetchClient};
pub use config::{ChatConfig, ClientConfig, RetryConfig};
pub use error::{Error, ErrorCode, Result, ServiceError};
pub use fallback::build_fallback;
pub use retry::{with_retry, with_retry_cancellable};
pub use session::{
    Clock, FileTokenStore, MemoryTokenStore, NavigationKind, PageLoadProbe, SessionHandle,
    SystemClock, TokenProvider,
};
pub use types::{
    Article, ChatReply, ChatRequest, EnhanceSummaryRequest, EnhancedSummaryResponse, Event,
};
