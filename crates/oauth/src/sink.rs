use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use {
    secrecy::SecretString,
    tracing::{debug, error, warn},
};

use crate::{
    error::Result,
    storage::write_private,
    types::{StoredToken, TokenResponse},
};

/// Receives the access token after a successful login. Both operations are
/// idempotent and report nothing back to the flow.
pub trait SessionTokenSink: Send + Sync {
    fn set_token(&self, token: &TokenResponse);
    fn clear_token(&self);
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Keeps the most recent token in memory.
#[derive(Debug, Default)]
pub struct MemoryTokenSink {
    inner: Mutex<MemorySinkState>,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    token: Option<SecretString>,
    set_calls: usize,
}

impl MemoryTokenSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<SecretString> {
        self.inner.lock().ok().and_then(|s| s.token.clone())
    }

    /// Number of `set_token` calls so far.
    pub fn set_calls(&self) -> usize {
        self.inner.lock().map(|s| s.set_calls).unwrap_or(0)
    }
}

impl SessionTokenSink for MemoryTokenSink {
    fn set_token(&self, token: &TokenResponse) {
        if let Ok(mut state) = self.inner.lock() {
            state.token = Some(token.access_token.clone());
            state.set_calls += 1;
        }
    }

    fn clear_token(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.token = None;
        }
    }
}

/// File-backed token storage (`tokens.json`, owner-only permissions).
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("tokens.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        write_private(&self.path, &serde_json::to_vec_pretty(token)?)
    }

    /// The stored token, or `None` if absent or unreadable.
    pub fn load(&self) -> Option<StoredToken> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable token file");
                None
            },
        }
    }

    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl SessionTokenSink for TokenStore {
    fn set_token(&self, token: &TokenResponse) {
        let stored = StoredToken {
            access_token: token.access_token.clone(),
            token_type: token.token_type.clone(),
            stored_at: unix_now(),
        };
        match self.save(&stored) {
            Ok(()) => debug!(path = %self.path.display(), "stored access token"),
            Err(e) => error!(path = %self.path.display(), error = %e, "failed to store access token"),
        }
    }

    fn clear_token(&self) {
        if let Err(e) = self.delete() {
            error!(path = %self.path.display(), error = %e, "failed to remove access token");
        }
    }
}
