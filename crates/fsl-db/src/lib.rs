//! Storage layer for focus sleep.
//!
//! Provides the shared key-value substrate using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Wrap it in a `Mutex` (as `fsl_core::SessionManager` does) to share it.
//!
//! # Multiple Processes
//!
//! The trigger and the reader are separate processes opening the same file.
//! `take` runs in an `IMMEDIATE` transaction so the pending slot is consumed
//! at most once, and a busy timeout lets writers wait for each other instead
//! of failing.
//!
//! # Schema
//!
//! One `kv` table. A removed key keeps its row with a `NULL` value so its
//! `revision` keeps increasing; readers poll revisions to notice changes.
//! `updated_at` is ISO 8601 (e.g., `2024-01-15T10:30:00.000Z`).

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use fsl_core::{KeyValueStore, StoreError};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use thiserror::Error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for key {key}: {timestamp}")]
    TimestampParse {
        key: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::backend(err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- value: encoded blob, NULL once removed
            -- revision: bumped on every write or removal
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB,
                revision INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>, DbError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get::<_, Option<Vec<u8>>>(0)
            })
            .optional()?;
        Ok(value.flatten())
    }

    fn set_value(&self, key: &str, value: &[u8]) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO kv (key, value, revision, updated_at)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                revision = kv.revision + 1,
                updated_at = excluded.updated_at
            ",
            params![key, value, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    fn take_value(&self, key: &str) -> Result<Option<Vec<u8>>, DbError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = tx
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get::<_, Option<Vec<u8>>>(0)
            })
            .optional()?
            .flatten();
        if value.is_some() {
            tx.execute(
                "UPDATE kv SET value = NULL, revision = revision + 1, updated_at = ?2 WHERE key = ?1",
                params![key, format_timestamp(Utc::now())],
            )?;
        }
        tx.commit()?;
        if value.is_some() {
            tracing::debug!(key, "consumed value");
        }
        Ok(value)
    }

    fn revision_of(&self, key: &str) -> Result<Option<u64>, DbError> {
        let revision = self
            .conn
            .query_row("SELECT revision FROM kv WHERE key = ?", [key], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(revision.map(|value| u64::try_from(value).unwrap_or(0)))
    }

    /// When a key was last written or removed.
    pub fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, DbError> {
        let timestamp: Option<String> = self
            .conn
            .query_row("SELECT updated_at FROM kv WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        timestamp
            .map(|timestamp| parse_timestamp(&timestamp, key))
            .transpose()
    }

    /// Filesystem path of the database, `None` for in-memory databases.
    pub fn path(&self) -> Option<&str> {
        self.conn.path().filter(|path| !path.is_empty())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get_value(key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        Ok(self.set_value(key, value)?)
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.take_value(key)?.is_some())
    }

    fn take(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.take_value(key)?)
    }

    fn revision(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.revision_of(key)?)
    }
}

fn parse_timestamp(timestamp: &str, key: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            key: key.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
