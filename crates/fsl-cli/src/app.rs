//! Shared state for commands: the session manager plus the cross-process lock.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use fs2::FileExt;
use fsl_core::{KeyValueStore, SessionManager};
use fsl_db::Database;

use crate::Config;

/// Everything a command needs to touch session state.
pub struct App<S: KeyValueStore, Tz: TimeZone = Local> {
    pub manager: SessionManager<S, Tz>,
    database_path: Option<PathBuf>,
}

impl App<Database, Local> {
    /// Opens the configured database, creating its directory if needed.
    pub fn open(config: &Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            fs::create_dir_all(parent).context("failed to create database directory")?;
        }
        let db = Database::open(&config.database_path).with_context(|| {
            format!(
                "failed to open database {}",
                config.database_path.display()
            )
        })?;
        Ok(Self {
            manager: SessionManager::new(db),
            database_path: Some(config.database_path.clone()),
        })
    }
}

impl<S: KeyValueStore, Tz: TimeZone> App<S, Tz> {
    /// Wraps a manager that is not backed by a file; no lock is taken.
    pub const fn detached(manager: SessionManager<S, Tz>) -> Self {
        Self {
            manager,
            database_path: None,
        }
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }

    /// Serializes mutating commands across `fsl` processes.
    ///
    /// The lock file lives beside the database and is released on drop.
    pub fn write_lock(&self) -> Result<WriteLock> {
        let Some(path) = &self.database_path else {
            return Ok(WriteLock { file: None });
        };
        let lock_path = path.with_extension("lock");
        let file = File::create(&lock_path)
            .with_context(|| format!("failed to create lock file {}", lock_path.display()))?;
        file.lock_exclusive()
            .context("failed to acquire session lock")?;
        tracing::debug!(path = %lock_path.display(), "acquired session lock");
        Ok(WriteLock { file: Some(file) })
    }
}

/// Guard for [`App::write_lock`].
#[derive(Debug)]
pub struct WriteLock {
    file: Option<File>,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Some(Err(err)) = self.file.as_ref().map(FileExt::unlock) {
            tracing::warn!(error = %err, "failed to release session lock");
        }
    }
}
