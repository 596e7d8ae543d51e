use super::ApiBackend;
use crate::cache::{NewsByCategory, SessionCache};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::Article;
use futures::future::join_all;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

const ALL_NEWS_PATH: &str = "api/news/all";
const SEARCH_PATH: &str = "api/news/search";
const PING_PATH: &str = "api/health/ping";

/// Listing bodies come either bare or wrapped in `{"articles": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum ArticleList {
    Bare(Vec<Article>),
    Wrapped { articles: Vec<Article> },
}

impl From<ArticleList> for Vec<Article> {
    fn from(list: ArticleList) -> Self {
        match list {
            ArticleList::Bare(articles) | ArticleList::Wrapped { articles } => articles,
        }
    }
}

/// Loading flag on the cache for the lifetime of one fetch
///
/// Cleared on drop, so a failed or abandoned fetch never leaves the cache
/// stuck in the loading state.
struct LoadingMark<'a> {
    cache: &'a SessionCache,
    armed: bool,
}

impl<'a> LoadingMark<'a> {
    fn set(cache: &'a SessionCache) -> Self {
        cache.mark_loading();
        Self { cache, armed: true }
    }

    /// The fetch stored its result; nothing to clear
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingMark<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.clear_loading();
        }
    }
}

/// Client for news listings
///
/// The dashboard listing (`get_all_news`) is served from the [`SessionCache`]
/// while it is valid. Failures are returned as errors, there is no fallback.
#[derive(Clone)]
pub struct NewsFetchClient {
    backend: ApiBackend,
    cache: Arc<SessionCache>,
}

impl NewsFetchClient {
    /// Create a client over a shared backend and cache
    pub fn new(backend: ApiBackend, cache: Arc<SessionCache>) -> Self {
        Self { backend, cache }
    }

    /// The session cache backing `get_all_news`
    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    /// Articles of one category
    pub async fn get_category(&self, category: &str) -> Result<Vec<Article>> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::MissingField { field: "category" });
        }

        let token = self.backend.require_token("load news category")?;
        let path = format!("api/news/{}", urlencoding::encode(category));
        let url = self.backend.endpoint(&path)?;

        let list: ArticleList = self.fetch(url, Some(token), "news-category").await?;
        Ok(list.into())
    }

    /// Dashboard listing of every category, cached per session
    pub async fn get_all_news(&self) -> Result<NewsByCategory> {
        if let Some(cached) = self.cache.get_cached_data() {
            tracing::debug!(categories = cached.len(), "Serving news listing from cache");
            return Ok(cached);
        }

        self.load_all_news().await
    }

    /// Drop the cached listing and fetch it again
    pub async fn refresh_all_news(&self) -> Result<NewsByCategory> {
        self.cache.force_refresh();
        self.load_all_news().await
    }

    async fn load_all_news(&self) -> Result<NewsByCategory> {
        let token = self.backend.require_token("load news dashboard")?;
        let url = self.backend.endpoint(ALL_NEWS_PATH)?;

        let mut loading = LoadingMark::set(&self.cache);
        let data = self
            .fetch::<NewsByCategory>(url, Some(token), "news-all")
            .await?;

        self.cache.set_cached_data(data.clone());
        loading.disarm();
        Ok(data)
    }

    /// Full-text article search
    pub async fn search(&self, query: &str) -> Result<Vec<Article>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::MissingField { field: "query" });
        }

        let token = self.backend.require_token("search news")?;
        let mut url = self.backend.endpoint(SEARCH_PATH)?;
        url.query_pairs_mut().append_pair("q", query);

        let list: ArticleList = self.fetch(url, Some(token), "news-search").await?;
        Ok(list.into())
    }

    /// Fetch several categories concurrently
    ///
    /// One result per input category, in input order.
    pub async fn get_categories(
        &self,
        categories: &[&str],
    ) -> Vec<(String, Result<Vec<Article>>)> {
        let results =
            join_all(categories.iter().map(|category| self.get_category(category))).await;

        categories
            .iter()
            .map(|category| category.to_string())
            .zip(results)
            .collect()
    }

    /// Backend liveness, single unauthenticated attempt
    pub async fn ping(&self) -> bool {
        let url = match self.backend.endpoint(PING_PATH) {
            Ok(url) => url,
            Err(_) => return false,
        };

        let retry = self.backend.config().retry.with_max_attempts(1);
        let outcome = with_retry(&retry, "ping", || {
            let backend = self.backend.clone();
            let url = url.clone();
            async move { backend.get_status(url).await }
        })
        .await;

        match outcome {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Backend ping failed");
                false
            }
        }
    }

    async fn fetch<T>(&self, url: Url, token: Option<String>, context: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let retry = &self.backend.config().retry;
        let value = with_retry(retry, context, || {
            let backend = self.backend.clone();
            let url = url.clone();
            let token = token.clone();
            async move { backend.get_json::<T>(url, token.as_deref()).await }
        })
        .await?;

        Ok(value)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::{MemoryTokenStore, SessionHandle, SystemClock};
    use serde_json::json;

    fn client(tokens: MemoryTokenStore) -> NewsFetchClient {
        let backend = ApiBackend::new(ClientConfig::default(), Arc::new(tokens)).unwrap();
        let cache = SessionCache::new(SessionHandle::new("s1"), Arc::new(SystemClock));
        NewsFetchClient::new(backend, Arc::new(cache))
    }

    #[test]
    fn article_lists_accept_both_shapes() {
        let bare: ArticleList =
            serde_json::from_value(json!([{"id": 1, "title": "t", "category": "tech"}])).unwrap();
        let wrapped: ArticleList = serde_json::from_value(
            json!({"articles": [{"id": "a", "title": "t", "category": "tech"}]}),
        )
        .unwrap();

        assert_eq!(Vec::<Article>::from(bare)[0].id, "1");
        assert_eq!(Vec::<Article>::from(wrapped)[0].id, "a");
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected_before_auth() {
        let client = client(MemoryTokenStore::new());

        assert!(matches!(
            client.get_category("  ").await,
            Err(Error::MissingField { field: "category" })
        ));
        assert!(matches!(
            client.search("").await,
            Err(Error::MissingField { field: "query" })
        ));
    }

    #[tokio::test]
    async fn missing_token_leaves_cache_untouched() {
        let client = client(MemoryTokenStore::new());

        assert!(matches!(client.get_all_news().await, Err(Error::AuthRequired)));
        assert!(!client.cache().is_loading());
        assert_eq!(client.cache().snapshot(), None);
    }

    #[test]
    fn loading_mark_clears_unless_disarmed() {
        let cache = SessionCache::new(SessionHandle::new("s1"), Arc::new(SystemClock));

        {
            let _loading = LoadingMark::set(&cache);
            assert!(cache.is_loading());
        }
        assert!(!cache.is_loading());
        assert_eq!(cache.snapshot(), None);

        let mut loading = LoadingMark::set(&cache);
        cache.set_cached_data(NewsByCategory::new());
        loading.disarm();
        drop(loading);
        assert!(cache.snapshot().is_some());
    }
}
