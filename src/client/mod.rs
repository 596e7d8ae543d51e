//! Backend API clients
//!
//! [`ApiBackend`] owns the pieces every call shares: the HTTP transport, the
//! base URL, the token store, and the event channel. The orchestrators are
//! thin layers over it:
//!
//! - [`ArticleEnhancementClient`] - AI summaries and article chat, degrading
//!   to synthesized content instead of failing
//! - [`NewsFetchClient`] - category, dashboard, and search reads, backed by
//!   the session cache

mod enhancement;
mod news;

pub use enhancement::ArticleEnhancementClient;
pub use news::NewsFetchClient;

use crate::classify::Failure;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::session::TokenProvider;
use crate::types::Event;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;

/// Shared HTTP layer for the API clients
///
/// Cheap to clone; clones share the transport, token store, and event channel.
#[derive(Clone)]
pub struct ApiBackend {
    http: reqwest::Client,
    base_url: Url,
    config: Arc<ClientConfig>,
    tokens: Arc<dyn TokenProvider>,
    event_tx: broadcast::Sender<Event>,
}

impl ApiBackend {
    /// Build a backend with its own HTTP client
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Self::with_http_client(config, tokens, http)
    }

    /// Build a backend around a caller-supplied HTTP client
    pub fn with_http_client(
        config: ClientConfig,
        tokens: Arc<dyn TokenProvider>,
        http: reqwest::Client,
    ) -> Result<Self> {
        config.validate()?;

        let base_url = directory_url(&config.base_url)?;
        let (event_tx, _rx) = broadcast::channel(config.event_capacity);

        Ok(Self {
            http,
            base_url,
            config: Arc::new(config),
            tokens,
            event_tx,
        })
    }

    /// Subscribe to API events
    ///
    /// Each subscriber receives every event independently. A subscriber that
    /// falls more than `event_capacity` events behind loses the oldest ones.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token store in use
    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        &self.tokens
    }

    pub(crate) fn emit(&self, event: Event) {
        // no subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Current non-blank token, if any
    pub(crate) fn current_token(&self) -> Option<String> {
        self.tokens.get().filter(|token| !token.trim().is_empty())
    }

    /// Current token, or `AuthRequired` (announced on the event channel)
    pub(crate) fn require_token(&self, reason: &str) -> Result<String> {
        match self.current_token() {
            Some(token) => Ok(token),
            None => {
                tracing::warn!(reason, "No session token, refusing to call backend");
                self.emit(Event::AuthRequired {
                    reason: reason.to_string(),
                });
                Err(Error::AuthRequired)
            }
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub(crate) async fn get_json<T>(
        &self,
        url: Url,
        token: Option<&str>,
    ) -> std::result::Result<T, Failure>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(%url, authenticated = token.is_some(), "GET");
        let request = self.authorize(self.http.get(url), token);
        self.dispatch(request, token.is_some()).await
    }

    pub(crate) async fn post_json<B, T>(
        &self,
        url: Url,
        token: Option<&str>,
        body: &B,
    ) -> std::result::Result<T, Failure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(%url, authenticated = token.is_some(), "POST");
        let request = self.authorize(self.http.post(url).json(body), token);
        self.dispatch(request, token.is_some()).await
    }

    /// Unauthenticated GET that only checks for a 2xx status
    pub(crate) async fn get_status(&self, url: Url) -> std::result::Result<(), Failure> {
        tracing::debug!(%url, "GET (status only)");
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(Failure::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    fn authorize(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn dispatch<T>(
        &self,
        request: RequestBuilder,
        authenticated: bool,
    ) -> std::result::Result<T, Failure>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && authenticated {
            self.expire_session();
            return Err(Failure::Status {
                status: status.as_u16(),
                body: "Session expired".to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Failure::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }

    fn expire_session(&self) {
        tracing::warn!("Backend rejected session token, clearing local session");
        if let Err(e) = self.tokens.clear() {
            tracing::error!(error = %e, "Failed to clear session token");
        }
        self.emit(Event::SessionExpired);
    }
}

/// Base URL with a trailing slash, so relative paths join beneath it
fn directory_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
