//! Session state: auth tokens, session identity, and environment probes
//!
//! Everything the clients would otherwise read from ambient globals is
//! injected through the types here, so tests can substitute fakes.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Storage for the bearer token
///
/// Blank tokens are treated as absent by the clients.
pub trait TokenProvider: Send + Sync {
    /// Current token, if any
    fn get(&self) -> Option<String>;

    /// Store a new token
    fn set(&self, token: String) -> Result<()>;

    /// Forget the token (logout or expired session)
    fn clear(&self) -> Result<()>;
}

/// In-process token storage
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenProvider for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: String) -> Result<()> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

/// Token storage that survives restarts
///
/// The token lives in a small JSON file (`{"token": "..."}`). Writes go to a
/// sibling temp file first and are renamed into place.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store backed by `path` (the file need not exist yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let stored: StoredToken = serde_json::from_slice(&bytes)?;
                Ok(Some(stored.token))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl TokenProvider for FileTokenStore {
    fn get(&self) -> Option<String> {
        match self.read() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Unreadable token file, treating session as absent"
                );
                None
            }
        }
    }

    fn set(&self, token: String) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(&StoredToken { token })?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Handle to the live session id
///
/// Clones share the same id. The cache is only valid for the id it was
/// written under.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: Arc<RwLock<String>>,
}

impl SessionHandle {
    /// Handle with a known id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Arc::new(RwLock::new(id.into())),
        }
    }

    /// Handle with a freshly generated id
    pub fn generate() -> Self {
        Self::new(new_session_id())
    }

    /// Current session id
    pub fn current(&self) -> String {
        self.id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a new session, returning the new id
    pub fn rotate(&self) -> String {
        let next = new_session_id();
        self.replace(next.clone());
        next
    }

    /// Replace the session id
    pub fn replace(&self, id: impl Into<String>) {
        *self.id.write().unwrap_or_else(PoisonError::into_inner) = id.into();
    }
}

/// `session_<unix millis>_<9 random alphanumerics>`
fn new_session_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Reports whether the process started from a hard page reload
pub trait PageLoadProbe {
    /// True for a real reload, false for a soft in-app navigation
    fn is_fresh_page_load(&self) -> bool;
}

impl<F> PageLoadProbe for F
where
    F: Fn() -> bool,
{
    fn is_fresh_page_load(&self) -> bool {
        self()
    }
}

/// How the current page was reached, as reported by navigation timing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    /// Ordinary navigation (link, typed URL, in-app route change)
    Navigate,
    /// Hard reload of the page
    Reload,
    /// History traversal
    BackForward,
    /// Speculative prerender
    Prerender,
}

impl PageLoadProbe for NavigationKind {
    fn is_fresh_page_load(&self) -> bool {
        matches!(self, NavigationKind::Reload)
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
