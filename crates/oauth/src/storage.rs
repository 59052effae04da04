//! Session-scoped key/value storage and the single-slot pending
//! authorization store built on top of it.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use {secrecy::ExposeSecret, tracing::debug};

use crate::{
    error::{Error, Result},
    types::PendingAuthorization,
};

pub const STATE_KEY: &str = "tripwire.oauth.state";
pub const VERIFIER_KEY: &str = "tripwire.oauth.code_verifier";

/// Per-session string store. One instance backs one login session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("session storage lock poisoned".into())
}

/// In-memory storage, lost when dropped.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().map(|e| e.is_empty()).unwrap_or(true)
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// JSON-file storage that survives process restarts. The file is created
/// with owner-only permissions and deleted once it holds no keys.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `pending-auth.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("pending-auth.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::Storage(format!("corrupt session file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if map.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        write_private(&self.path, &serde_json::to_vec_pretty(map)?)
    }
}

impl SessionStorage for FileSessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut map = match self.read_map() {
            Ok(map) => map,
            // An unreadable file cannot be trusted; drop it entirely.
            Err(Error::Storage(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        if map.remove(key).is_some() || map.is_empty() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Write `contents` to `path` via a temp file and rename. On unix the temp
/// file is created with mode 0600. It is removed again if any step fails.
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let result = write_tmp(&tmp, contents).and_then(|()| std::fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn write_tmp(tmp: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(tmp)?;
    // `mode` only applies on creation; a stale temp file keeps its own.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

/// Holds at most one pending authorization. Saving a new one replaces the
/// previous attempt.
#[derive(Clone)]
pub struct PendingAuthStore {
    storage: Arc<dyn SessionStorage>,
}

impl PendingAuthStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn save(&self, pending: &PendingAuthorization) -> Result<()> {
        self.storage.set(STATE_KEY, &pending.state)?;
        self.storage
            .set(VERIFIER_KEY, pending.verifier.expose_secret())?;
        debug!("saved pending authorization");
        Ok(())
    }

    /// Both keys must be present; a half-written slot reads as empty.
    pub fn load(&self) -> Result<Option<PendingAuthorization>> {
        let state = self.storage.get(STATE_KEY)?;
        let verifier = self.storage.get(VERIFIER_KEY)?;
        Ok(match (state, verifier) {
            (Some(state), Some(verifier)) => Some(PendingAuthorization::new(state, verifier)),
            _ => None,
        })
    }

    /// Remove both keys. Both removals are attempted even if the first fails.
    pub fn clear(&self) -> Result<()> {
        let state = self.storage.remove(STATE_KEY);
        let verifier = self.storage.remove(VERIFIER_KEY);
        state.and(verifier)
    }
}
