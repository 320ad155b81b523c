//! Session lifecycle: the single owner of the pending slot and history.
//!
//! Every operation runs under one mutex, so read-modify-write cycles on the
//! pending slot and the history blob never interleave within a process.
//! Cross-process exclusion is the caller's job (the CLI holds a file lock).

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, TimeZone, Utc};
use uuid::Uuid;

use crate::boundary::{self, NightBoundary};
use crate::codec;
use crate::config_store::ConfigStore;
use crate::error::SessionError;
use crate::history::{History, HistoryStore};
use crate::session::{FocusSession, PendingSession, PreparedSession};
use crate::store::{KeyValueStore, PENDING_SESSION_KEY, StoreError};
use crate::types::ValidationError;

/// Orchestrates start, completion and correction of focus sessions.
///
/// `Tz` defines the local calendar used to place the night boundary.
#[derive(Debug)]
pub struct SessionManager<S, Tz: TimeZone = Local> {
    store: Mutex<S>,
    tz: Tz,
}

impl<S: KeyValueStore> SessionManager<S, Local> {
    /// Creates a manager that evaluates boundaries in the system time zone.
    pub fn new(store: S) -> Self {
        Self::with_time_zone(store, Local)
    }
}

impl<S: KeyValueStore, Tz: TimeZone> SessionManager<S, Tz> {
    pub fn with_time_zone(store: S, tz: Tz) -> Self {
        Self {
            store: Mutex::new(store),
            tz,
        }
    }

    /// The calendar the night boundary is placed on.
    pub const fn time_zone(&self) -> &Tz {
        &self.tz
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>, SessionError> {
        self.store
            .lock()
            .map_err(|_| SessionError::Store(StoreError::Poisoned))
    }

    /// Runs a closure against the underlying store while holding the lock.
    ///
    /// Writes made through it bypass the manager's validation.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> Result<R, SessionError> {
        let store = self.lock()?;
        Ok(f(&store))
    }

    /// Opens a new pending session, replacing any session already open.
    pub fn start(
        &self,
        at: DateTime<Utc>,
        focus_name: Option<String>,
    ) -> Result<Uuid, SessionError> {
        let store = self.lock()?;
        let pending = PendingSession::new(at, focus_name);
        let bytes = codec::encode(&pending)?;
        if store.get(PENDING_SESSION_KEY)?.is_some() {
            tracing::warn!(id = %pending.id, "replacing an open focus session");
        }
        store.set(PENDING_SESSION_KEY, &bytes)?;
        tracing::info!(id = %pending.id, start = %at, "focus session started");
        Ok(pending.id)
    }

    pub fn has_active_session(&self) -> Result<bool, SessionError> {
        let store = self.lock()?;
        Ok(store.get(PENDING_SESSION_KEY)?.is_some())
    }

    /// Returns the open session without consuming it.
    pub fn active_session(&self) -> Result<Option<PendingSession>, SessionError> {
        let store = self.lock()?;
        store
            .get(PENDING_SESSION_KEY)?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
            .map_err(SessionError::from)
    }

    /// Drops the open session without writing history.
    pub fn abandon(&self) -> Result<bool, SessionError> {
        let store = self.lock()?;
        let removed = store.remove(PENDING_SESSION_KEY)?;
        if removed {
            tracing::info!("focus session abandoned");
        }
        Ok(removed)
    }

    /// Consumes the open session and evaluates it against the night boundary.
    ///
    /// Returns `Ok(None)` when no session is open. `focus_name` overrides the
    /// name captured at start. The slot is cleared before decoding; a record
    /// that fails to decode is reported with its raw contents.
    pub fn prepare_completion(
        &self,
        at: DateTime<Utc>,
        focus_name: Option<String>,
    ) -> Result<Option<PreparedSession>, SessionError> {
        let store = self.lock()?;
        let Some(bytes) = store.take(PENDING_SESSION_KEY)? else {
            return Ok(None);
        };
        let pending: PendingSession = codec::decode(&bytes).map_err(|source| {
            let raw = String::from_utf8_lossy(&bytes).into_owned();
            tracing::warn!(error = %source, %raw, "discarded undecodable pending session");
            SessionError::CorruptPendingSession { raw, source }
        })?;

        let night_boundary = ConfigStore::load(&*store)?;
        let verdict = boundary::evaluate(pending.start_date, at, night_boundary, &self.tz);
        tracing::debug!(id = %pending.id, %night_boundary, ?verdict, "evaluated focus session");

        let (recorded_start_date, recorded_end_date) = verdict.recorded_interval().unzip();
        Ok(Some(PreparedSession {
            id: pending.id,
            start_date: pending.start_date,
            end_date: at,
            focus_name: focus_name.or(pending.focus_name),
            recorded_start_date,
            recorded_end_date,
            eligible_for_health_export: verdict.is_eligible(),
        }))
    }

    /// Validates and stores a completed session at the head of history.
    pub fn store_completed(&self, session: FocusSession) -> Result<FocusSession, SessionError> {
        session.validate()?;
        let store = self.lock()?;
        let mut history = HistoryStore::load_for_update(&*store)?;
        let evicted = history.insert(session.clone());
        HistoryStore::save(&*store, &history)?;
        for old in &evicted {
            tracing::debug!(id = %old.id, "evicted session from history");
        }
        tracing::info!(id = %session.id, recorded = session.recorded_to_health, "stored focus session");
        Ok(session)
    }

    /// Corrects the export flag of a stored session. Unknown ids are ignored.
    pub fn update_status(&self, id: Uuid, recorded_to_health: bool) -> Result<(), SessionError> {
        let store = self.lock()?;
        let mut history = HistoryStore::load_for_update(&*store)?;
        if history.update_status(id, recorded_to_health)? {
            HistoryStore::save(&*store, &history)?;
            tracing::info!(%id, recorded_to_health, "updated session status");
        } else {
            tracing::debug!(%id, "status update for unknown session ignored");
        }
        Ok(())
    }

    /// Stored sessions, newest first. Unreadable history reads as empty.
    pub fn load_history(&self) -> Result<Vec<FocusSession>, SessionError> {
        let store = self.lock()?;
        Ok(HistoryStore::load(&*store)?.into_vec())
    }

    /// Adds sessions from an export behind the existing history.
    ///
    /// All records are validated before anything is written. Returns how
    /// many were added; known ids and overflow are skipped.
    pub fn import_history(&self, sessions: Vec<FocusSession>) -> Result<usize, SessionError> {
        let mut seen = std::collections::HashSet::new();
        for session in &sessions {
            session.validate()?;
            if !seen.insert(session.id) {
                return Err(ValidationError::DuplicateId { id: session.id }.into());
            }
        }
        let store = self.lock()?;
        let mut history: History = HistoryStore::load_for_update(&*store)?;
        let added = history.append_older(sessions);
        if added > 0 {
            HistoryStore::save(&*store, &history)?;
        }
        tracing::info!(added, "imported focus sessions");
        Ok(added)
    }

    pub fn night_boundary(&self) -> Result<NightBoundary, SessionError> {
        let store = self.lock()?;
        Ok(ConfigStore::load(&*store)?)
    }

    pub fn set_night_boundary(&self, boundary: NightBoundary) -> Result<(), SessionError> {
        let store = self.lock()?;
        ConfigStore::save(&*store, boundary)
    }
}
