//! Persisted night boundary setting.

use crate::boundary::NightBoundary;
use crate::codec;
use crate::error::SessionError;
use crate::store::{KeyValueStore, NIGHT_BOUNDARY_KEY, StoreError};

/// Reads and writes the single [`NightBoundary`] value.
///
/// The CLI setting and the boundary evaluator both go through this so they
/// always agree on the persisted value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigStore;

impl ConfigStore {
    /// Loads the boundary, falling back to the default when absent or unreadable.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<NightBoundary, StoreError> {
        let Some(bytes) = store.get(NIGHT_BOUNDARY_KEY)? else {
            return Ok(NightBoundary::default());
        };
        match codec::decode::<NightBoundary>(&bytes) {
            Ok(boundary) => Ok(boundary),
            Err(err) => {
                tracing::warn!(error = %err, "stored night boundary is invalid, using default");
                Ok(NightBoundary::default())
            }
        }
    }

    pub fn save<S: KeyValueStore + ?Sized>(
        store: &S,
        boundary: NightBoundary,
    ) -> Result<(), SessionError> {
        let bytes = codec::encode(&boundary)?;
        store.set(NIGHT_BOUNDARY_KEY, &bytes)?;
        tracing::debug!(%boundary, "saved night boundary");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::store::MemoryStore;

    #[test]
    fn absent_value_reads_as_default() {
        let store = MemoryStore::new();
        assert_eq!(ConfigStore::load(&store).unwrap().minutes_after_midnight(), 60);
    }

    #[test]
    fn saved_value_is_loaded() {
        let store = MemoryStore::new();
        ConfigStore::save(&store, NightBoundary::new(150).unwrap()).unwrap();
        assert_eq!(
            ConfigStore::load(&store).unwrap(),
            NightBoundary::new(150).unwrap()
        );
    }

    #[test]
    fn bare_legacy_integer_is_accepted() {
        let store = MemoryStore::new();
        store.set(NIGHT_BOUNDARY_KEY, b"120").unwrap();
        assert_eq!(ConfigStore::load(&store).unwrap().minutes_after_midnight(), 120);
    }

    #[test]
    fn out_of_range_value_reads_as_default() {
        let store = MemoryStore::new();
        store
            .set(NIGHT_BOUNDARY_KEY, br#"{"version":1,"data":5000}"#)
            .unwrap();
        assert_eq!(ConfigStore::load(&store).unwrap(), NightBoundary::default());
    }
}
