//! Key-value persistence contract shared by every process touching the data.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Mutex;

use thiserror::Error;

/// Key holding the encoded [`PendingSession`](crate::PendingSession).
pub const PENDING_SESSION_KEY: &str = "pending-session";
/// Key holding the encoded history, newest first.
pub const SESSION_HISTORY_KEY: &str = "session-history";
/// Key holding the night boundary in minutes after midnight.
pub const NIGHT_BOUNDARY_KEY: &str = "night-boundary-minutes";

/// Errors raised by a key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
    #[error("storage lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn backend(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// A keyed byte store.
///
/// Values are replaced whole; there are no partial updates. `take` must be
/// atomic so two processes cannot both consume the same value.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Removes a key, returning whether it existed.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// Reads and clears a key in one step.
    fn take(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Change counter for a key, bumped on every write or removal.
    ///
    /// `None` means the key has never been written.
    fn revision(&self, key: &str) -> Result<Option<u64>, StoreError>;
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug, Default)]
struct Entry {
    value: Option<Vec<u8>>,
    revision: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Entry>) -> R,
    ) -> Result<R, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut entries))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_entries(|entries| entries.get(key).and_then(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            let entry = entries.entry(key.to_string()).or_default();
            entry.value = Some(value.to_vec());
            entry.revision += 1;
        })
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.take(key)?.is_some())
    }

    fn take(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_entries(|entries| {
            let entry = entries.get_mut(key)?;
            let value = entry.value.take()?;
            entry.revision += 1;
            Some(value)
        })
    }

    fn revision(&self, key: &str) -> Result<Option<u64>, StoreError> {
        self.with_entries(|entries| entries.get(key).map(|entry| entry.revision))
    }
}
