//! Persistent sessions against a mock backend

mod common;

use common::*;
use newsfeed_client::{
    ApiBackend, CacheEntry, FileTokenStore, NavigationKind, NewsFetchClient, SessionCache,
    SessionHandle, SystemClock, TokenProvider,
};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file_backed(base_url: &str, store: &FileTokenStore) -> ApiBackend {
    ApiBackend::new(test_config(base_url), Arc::new(store.clone())).unwrap()
}

#[tokio::test]
async fn expired_session_removes_the_token_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/news/sports"))
        .and(header("authorization", "Bearer persisted"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let store = FileTokenStore::new(temp_dir.path().join("token.json"));
    store.set("persisted".into()).unwrap();

    let client = NewsFetchClient::new(
        file_backed(&mock_server.uri(), &store),
        cache(&SessionHandle::new("s1")),
    );

    let err = client.get_category("sports").await.unwrap_err();

    assert!(err.requires_login());
    assert!(!store.path().exists());
    assert_eq!(store.get(), None);
}

async fn warm_cache(base_url: &str, session: &SessionHandle) -> Option<CacheEntry> {
    let (backend, _tokens) = backend(base_url, Some("tok"));
    let client = NewsFetchClient::new(backend, cache(session));
    client.get_all_news().await.unwrap();
    client.cache().snapshot()
}

#[tokio::test]
async fn cache_survives_navigation_but_not_reload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/news/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(all_news_body()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let session = SessionHandle::new("s1");
    let prior = warm_cache(&mock_server.uri(), &session).await;
    assert!(prior.is_some());

    // soft navigation: served from the carried-over entry
    let (backend, _tokens) = backend(&mock_server.uri(), Some("tok"));
    let restored = SessionCache::restore(
        prior.clone(),
        session.clone(),
        &NavigationKind::Navigate,
        Arc::new(SystemClock),
    );
    let navigated = NewsFetchClient::new(backend.clone(), Arc::new(restored));
    navigated.get_all_news().await.unwrap();

    // hard reload: the entry is dropped and the listing refetched
    let reloaded_cache =
        SessionCache::restore(prior, session, &NavigationKind::Reload, Arc::new(SystemClock));
    let reloaded = NewsFetchClient::new(backend, Arc::new(reloaded_cache));
    reloaded.get_all_news().await.unwrap();
}
