//! Per-session cache for the all-news listing
//!
//! Holds at most one [`CacheEntry`]. An entry is only readable while its
//! session id matches the live session; a mismatch discards it on the spot.
//! There is no time-based expiry: staleness is bounded by the session alone,
//! so a long-lived session keeps serving the same listing until the user
//! forces a refresh.
//!
//! The cache survives in-app navigation (share the same `Arc<SessionCache>`
//! or hand a [`snapshot`](SessionCache::snapshot) to
//! [`restore`](SessionCache::restore)), but never survives a hard reload.

use crate::session::{Clock, PageLoadProbe, SessionHandle};
use crate::types::Article;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Articles grouped by category name
pub type NewsByCategory = BTreeMap<String, Vec<Article>>;

/// The single cached listing
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    /// Listing by category
    pub data: NewsByCategory,
    /// When the entry was last written
    pub timestamp: DateTime<Utc>,
    /// A fetch for this entry is in flight
    pub is_loading: bool,
    /// Session the entry belongs to
    pub session_id: String,
}

impl CacheEntry {
    // A loading entry without data is only a marker for an in-flight fetch
    fn is_placeholder(&self) -> bool {
        self.is_loading && self.data.is_empty()
    }
}

/// Why an entry was thrown away
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Invalidation {
    SessionMismatch,
    PageReload,
    ForcedRefresh,
}

impl Invalidation {
    fn as_str(&self) -> &'static str {
        match self {
            Invalidation::SessionMismatch => "session_mismatch",
            Invalidation::PageReload => "page_reload",
            Invalidation::ForcedRefresh => "forced_refresh",
        }
    }
}

/// Session-scoped cache of the all-news listing
pub struct SessionCache {
    entry: Mutex<Option<CacheEntry>>,
    session: SessionHandle,
    clock: Arc<dyn Clock>,
}

impl SessionCache {
    /// Empty cache bound to `session`
    pub fn new(session: SessionHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            entry: Mutex::new(None),
            session,
            clock,
        }
    }

    /// Cache seeded with an entry carried over from before
    ///
    /// `prior` is discarded when `probe` reports a hard page reload.
    pub fn restore(
        prior: Option<CacheEntry>,
        session: SessionHandle,
        probe: &dyn PageLoadProbe,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Self::new(session, clock);

        match prior {
            Some(_) if probe.is_fresh_page_load() => {
                tracing::info!(
                    reason = Invalidation::PageReload.as_str(),
                    "Discarding news cache on page reload"
                );
            }
            Some(entry) => *cache.lock() = Some(entry),
            None => {}
        }

        cache
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the entry if it belongs to another session; returns the guard
    fn checked(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        let mut guard = self.lock();
        let live = self.session.current();

        if let Some(entry) = guard.as_ref()
            && entry.session_id != live
        {
            tracing::info!(
                reason = Invalidation::SessionMismatch.as_str(),
                cached_session = %entry.session_id,
                live_session = %live,
                "Discarding news cache from another session"
            );
            *guard = None;
        }

        guard
    }

    /// True if a usable entry exists for the live session
    ///
    /// An entry from another session is cleared as a side effect.
    pub fn has_valid_cache(&self) -> bool {
        self.checked()
            .as_ref()
            .is_some_and(|entry| !entry.is_placeholder())
    }

    /// Cached listing, if valid
    pub fn get_cached_data(&self) -> Option<NewsByCategory> {
        self.checked()
            .as_ref()
            .filter(|entry| !entry.is_placeholder())
            .map(|entry| entry.data.clone())
    }

    /// Cached articles of one category, if valid
    pub fn get_category(&self, category: &str) -> Option<Vec<Article>> {
        self.checked()
            .as_ref()
            .filter(|entry| !entry.is_placeholder())
            .and_then(|entry| entry.data.get(category).cloned())
    }

    /// Replace the entry, stamped with the current time and session
    pub fn set_cached_data(&self, data: NewsByCategory) {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now(),
            is_loading: false,
            session_id: self.session.current(),
        };

        tracing::info!(
            categories = entry.data.len(),
            session = %entry.session_id,
            "Stored news listing in session cache"
        );
        *self.lock() = Some(entry);
    }

    /// Flag a fetch as in flight
    ///
    /// Flags the current entry in place, or creates a placeholder when there
    /// is none.
    pub fn mark_loading(&self) {
        let now = self.clock.now();
        let session_id = self.session.current();
        let mut guard = self.checked();

        if let Some(entry) = guard.as_mut() {
            entry.is_loading = true;
            return;
        }

        *guard = Some(CacheEntry {
            data: NewsByCategory::new(),
            timestamp: now,
            is_loading: true,
            session_id,
        });
    }

    /// Clear the in-flight flag; a bare placeholder is removed entirely
    pub fn clear_loading(&self) {
        let mut guard = self.lock();
        if guard.as_ref().is_some_and(CacheEntry::is_placeholder) {
            *guard = None;
        } else if let Some(entry) = guard.as_mut() {
            entry.is_loading = false;
        }
    }

    /// Whether a fetch is in flight
    pub fn is_loading(&self) -> bool {
        self.lock().as_ref().is_some_and(|entry| entry.is_loading)
    }

    /// Explicit invalidation for user-triggered refreshes
    pub fn force_refresh(&self) {
        let mut guard = self.lock();
        if guard.take().is_some() {
            tracing::info!(
                reason = Invalidation::ForcedRefresh.as_str(),
                "Discarding news cache on request"
            );
        }
    }

    /// When the entry was last written
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.checked().as_ref().map(|entry| entry.timestamp)
    }

    /// Copy of the raw entry, for carrying the cache across navigation
    pub fn snapshot(&self) -> Option<CacheEntry> {
        self.lock().clone()
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("entry", &*self.lock())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NavigationKind;
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()))
    }

    fn listing() -> NewsByCategory {
        let mut data = NewsByCategory::new();
        data.insert(
            "sports".into(),
            vec![Article::new("a1", "X", "Y", "sports")],
        );
        data.insert(
            "tech".into(),
            vec![Article::new("t1", "Chips", "Smaller", "tech")],
        );
        data
    }

    #[test]
    fn set_then_read_within_same_session() {
        let cache = SessionCache::new(SessionHandle::new("s1"), clock());
        assert!(!cache.has_valid_cache());
        assert_eq!(cache.get_cached_data(), None);

        cache.set_cached_data(listing());

        assert!(cache.has_valid_cache());
        assert_eq!(cache.get_cached_data(), Some(listing()));
        assert_eq!(cache.get_category("tech").unwrap()[0].id, "t1");
        assert_eq!(cache.get_category("weather"), None);
        assert_eq!(
            cache.last_updated(),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn new_session_invalidates_and_clears() {
        let session = SessionHandle::new("s1");
        let cache = SessionCache::new(session.clone(), clock());
        cache.set_cached_data(listing());

        session.rotate();

        assert!(!cache.has_valid_cache());
        assert_eq!(cache.get_cached_data(), None);
        assert_eq!(cache.snapshot(), None, "mismatch clears the entry");

        // switching back does not resurrect the old entry
        session.replace("s1");
        assert!(!cache.has_valid_cache());
    }

    #[test]
    fn entry_is_stamped_with_live_session() {
        let session = SessionHandle::new("s1");
        let cache = SessionCache::new(session.clone(), clock());
        session.replace("s2");

        cache.set_cached_data(listing());

        assert_eq!(cache.snapshot().unwrap().session_id, "s2");
        assert!(cache.has_valid_cache());
    }

    #[test]
    fn reload_discards_prior_entry() {
        let session = SessionHandle::new("s1");
        let seeded = SessionCache::new(session.clone(), clock());
        seeded.set_cached_data(listing());
        let prior = seeded.snapshot();

        let reloaded = SessionCache::restore(
            prior.clone(),
            session.clone(),
            &NavigationKind::Reload,
            clock(),
        );
        assert!(!reloaded.has_valid_cache());

        let navigated =
            SessionCache::restore(prior, session, &NavigationKind::Navigate, clock());
        assert!(navigated.has_valid_cache());
        assert_eq!(navigated.get_cached_data(), Some(listing()));
    }

    #[test]
    fn reload_probe_can_be_a_closure() {
        let session = SessionHandle::new("s1");
        let seeded = SessionCache::new(session.clone(), clock());
        seeded.set_cached_data(listing());

        let fresh = || true;
        let cache = SessionCache::restore(seeded.snapshot(), session, &fresh, clock());
        assert!(!cache.has_valid_cache());
    }

    #[test]
    fn force_refresh_empties_the_cache() {
        let cache = SessionCache::new(SessionHandle::new("s1"), clock());
        cache.set_cached_data(listing());

        cache.force_refresh();

        assert!(!cache.has_valid_cache());
        assert_eq!(cache.get_cached_data(), None);
    }

    #[test]
    fn placeholder_is_not_a_valid_cache() {
        let cache = SessionCache::new(SessionHandle::new("s1"), clock());

        cache.mark_loading();
        assert!(cache.is_loading());
        assert!(!cache.has_valid_cache());
        assert_eq!(cache.get_cached_data(), None);

        cache.clear_loading();
        assert!(!cache.is_loading());
        assert_eq!(cache.snapshot(), None, "bare placeholder is removed");
    }

    #[test]
    fn refresh_in_flight_keeps_serving_existing_data() {
        let cache = SessionCache::new(SessionHandle::new("s1"), clock());
        cache.set_cached_data(listing());

        cache.mark_loading();
        assert!(cache.is_loading());
        assert!(cache.has_valid_cache());

        cache.clear_loading();
        assert!(!cache.is_loading());
        assert_eq!(cache.get_cached_data(), Some(listing()));
    }

    #[test]
    fn storing_data_ends_loading() {
        let cache = SessionCache::new(SessionHandle::new("s1"), clock());
        cache.mark_loading();
        cache.set_cached_data(listing());

        assert!(!cache.is_loading());
        assert!(cache.has_valid_cache());
    }
}
