//! Polling change detection for readers in other processes.

use std::collections::HashMap;

use crate::store::{KeyValueStore, StoreError};

/// Remembers key revisions and reports which keys changed between polls.
#[derive(Debug, Clone)]
pub struct ChangeWatcher {
    seen: HashMap<&'static str, Option<u64>>,
}

impl ChangeWatcher {
    /// Starts watching `keys` from their current revisions.
    pub fn new<S: KeyValueStore + ?Sized>(
        store: &S,
        keys: &[&'static str],
    ) -> Result<Self, StoreError> {
        let mut seen = HashMap::with_capacity(keys.len());
        for key in keys {
            seen.insert(*key, store.revision(key)?);
        }
        Ok(Self { seen })
    }

    /// Returns the keys whose revision moved since the last poll.
    pub fn poll<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<Vec<&'static str>, StoreError> {
        let mut changed = Vec::new();
        for (key, last) in &mut self.seen {
            let current = store.revision(key)?;
            if current != *last {
                *last = current;
                changed.push(*key);
            }
        }
        changed.sort_unstable();
        Ok(changed)
    }
}
