//! Bounded, newest-first history of completed sessions.

use uuid::Uuid;

use crate::codec;
use crate::error::SessionError;
use crate::session::FocusSession;
use crate::store::{KeyValueStore, SESSION_HISTORY_KEY, StoreError};
use crate::types::ValidationError;

/// Maximum number of sessions kept in history.
pub const HISTORY_CAPACITY: usize = 60;

/// Completed sessions ordered by insertion, newest first.
///
/// Ids are unique and the length never exceeds [`HISTORY_CAPACITY`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    sessions: Vec<FocusSession>,
}

impl History {
    /// Builds a history from stored order, dropping later duplicates and the
    /// tail beyond capacity.
    pub fn from_sessions(sessions: Vec<FocusSession>) -> Self {
        let mut history = Self::default();
        for session in sessions {
            if history.len() == HISTORY_CAPACITY {
                break;
            }
            if history.find(session.id).is_none() {
                history.sessions.push(session);
            }
        }
        history
    }

    pub fn as_slice(&self) -> &[FocusSession] {
        &self.sessions
    }

    pub fn into_vec(self) -> Vec<FocusSession> {
        self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn find(&self, id: Uuid) -> Option<&FocusSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    /// Pushes a session to the head, returning whatever fell off the tail.
    ///
    /// An existing record with the same id is replaced rather than duplicated.
    pub fn insert(&mut self, session: FocusSession) -> Vec<FocusSession> {
        self.sessions.retain(|existing| existing.id != session.id);
        self.sessions.insert(0, session);
        if self.sessions.len() > HISTORY_CAPACITY {
            self.sessions.split_off(HISTORY_CAPACITY)
        } else {
            Vec::new()
        }
    }

    /// Sets `recorded_to_health` on the session with `id`.
    ///
    /// Returns `Ok(false)` when no such session exists. Every other field is
    /// left untouched.
    pub fn update_status(&mut self, id: Uuid, recorded_to_health: bool) -> Result<bool, ValidationError> {
        let Some(session) = self.sessions.iter_mut().find(|session| session.id == id) else {
            return Ok(false);
        };
        if recorded_to_health && session.recorded_duration().is_none() {
            return Err(ValidationError::NotRecordable { id });
        }
        session.recorded_to_health = recorded_to_health;
        Ok(true)
    }

    /// Appends sessions behind the existing ones, skipping known ids, until
    /// capacity is reached. Returns how many were added.
    pub fn append_older(&mut self, sessions: impl IntoIterator<Item = FocusSession>) -> usize {
        let mut added = 0;
        for session in sessions {
            if self.sessions.len() == HISTORY_CAPACITY {
                break;
            }
            if self.find(session.id).is_some() {
                continue;
            }
            self.sessions.push(session);
            added += 1;
        }
        added
    }
}

/// Loads and saves [`History`] as one blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryStore;

impl HistoryStore {
    /// Loads history, degrading to empty when absent or undecodable.
    ///
    /// Backend failures still propagate.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<History, StoreError> {
        let Some(bytes) = store.get(SESSION_HISTORY_KEY)? else {
            return Ok(History::default());
        };
        match codec::decode::<Vec<FocusSession>>(&bytes) {
            Ok(sessions) => Ok(History::from_sessions(sessions)),
            Err(err) => {
                tracing::warn!(error = %err, bytes = bytes.len(), "session history is unreadable, treating as empty");
                Ok(History::default())
            }
        }
    }

    /// Loads history for a read-modify-write cycle.
    ///
    /// Unlike [`HistoryStore::load`], an undecodable blob is an error so the
    /// caller never overwrites records it could not read.
    pub fn load_for_update<S: KeyValueStore + ?Sized>(
        store: &S,
    ) -> Result<History, SessionError> {
        let Some(bytes) = store.get(SESSION_HISTORY_KEY)? else {
            return Ok(History::default());
        };
        let sessions = codec::decode::<Vec<FocusSession>>(&bytes)?;
        Ok(History::from_sessions(sessions))
    }

    pub fn save<S: KeyValueStore + ?Sized>(store: &S, history: &History) -> Result<(), SessionError> {
        let bytes = codec::encode(&history.sessions)?;
        store.set(SESSION_HISTORY_KEY, &bytes)?;
        Ok(())
    }
}
