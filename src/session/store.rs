//! Persisted session storage.
//!
//! DESIGN
//! ======
//! Storage mirrors a browser key/value store: two string entries, the opaque
//! token under `auth_token` and the JSON-serialized profile under `auth_user`.
//! The guard only sees the `SessionStore` trait, so tests substitute the
//! in-memory store for the file-backed one.
//!
//! TRADE-OFFS
//! ==========
//! There is no locking across processes; concurrent writers race and the last
//! write wins, matching how separate browser tabs share local storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use super::UserProfile;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "auth_user";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session storage is not a JSON object: {0}")]
    Corrupt(serde_json::Error),
    #[error("profile serialization failed: {0}")]
    Serialize(serde_json::Error),
    #[error("session storage lock poisoned")]
    Poisoned,
}

/// Entries read back from storage. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedSession {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

/// Injectable persistence for the client session.
pub trait SessionStore: Send + Sync {
    /// Read both entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read at all. A
    /// profile entry that fails to parse is dropped rather than reported.
    fn load(&self) -> Result<PersistedSession, StoreError>;

    /// Write both entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be serialized or the write fails.
    fn save(&self, token: &str, user: &UserProfile) -> Result<(), StoreError>;

    /// Remove both entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

type Entries = BTreeMap<String, String>;

fn decode_entries(entries: &Entries) -> PersistedSession {
    let token = entries.get(TOKEN_KEY).cloned();
    let user = entries.get(USER_KEY).and_then(|raw| match serde_json::from_str::<UserProfile>(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "discarding unreadable persisted profile");
            None
        }
    });
    PersistedSession { token, user }
}

fn encode_entries(entries: &mut Entries, token: &str, user: &UserProfile) -> Result<(), StoreError> {
    let user = serde_json::to_string(user).map_err(StoreError::Serialize)?;
    entries.insert(TOKEN_KEY.to_owned(), token.to_owned());
    entries.insert(USER_KEY.to_owned(), user);
    Ok(())
}

fn remove_entries(entries: &mut Entries) {
    entries.remove(TOKEN_KEY);
    entries.remove(USER_KEY);
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<Entries>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a signed-in session.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be serialized.
    pub fn with_session(token: &str, user: &UserProfile) -> Result<Self, StoreError> {
        let store = Self::new();
        store.save(token, user)?;
        Ok(store)
    }

    /// Store pre-seeded with raw entries, e.g. a token with no profile.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { entries: Mutex::new(entries) }
    }

    /// Raw entry lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<PersistedSession, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(decode_entries(&entries))
    }

    fn save(&self, token: &str, user: &UserProfile) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        encode_entries(&mut entries, token, user)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        remove_entries(&mut entries);
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON object file holding the string entries. A missing file is an empty
/// store; unrelated keys in the file are preserved across writes.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Entries::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(StoreError::Corrupt),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(entries).map_err(StoreError::Serialize)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<PersistedSession, StoreError> {
        Ok(decode_entries(&self.read_entries()?))
    }

    fn save(&self, token: &str, user: &UserProfile) -> Result<(), StoreError> {
        // A corrupt file is replaced rather than blocking a fresh login.
        let mut entries = self.read_entries().unwrap_or_default();
        encode_entries(&mut entries, token, user)?;
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.read_entries().unwrap_or_default();
        remove_entries(&mut entries);
        self.write_entries(&entries)
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
