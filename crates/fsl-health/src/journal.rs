//! Local JSONL journal of in-bed samples.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;

use crate::{Authorization, HealthError, HealthSink, InBedSample};

/// Appends one JSON line per sample to a file.
///
/// Writers take an exclusive lock on the journal so concurrent processes
/// never interleave lines.
#[derive(Debug, Clone)]
pub struct JournalSink {
    path: PathBuf,
}

impl JournalSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every sample written so far.
    pub fn read_samples(&self) -> Result<Vec<InBedSample>, HealthError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(HealthError::from))
            .collect()
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn append_sample(path: &Path, sample: &InBedSample) -> Result<(), HealthError> {
    ensure_parent(path)?;
    let line = serde_json::to_string(sample)?;

    let mut file: File = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;
    let written = writeln!(file, "{line}");
    FileExt::unlock(&file)?;
    written?;
    Ok(())
}

impl HealthSink for JournalSink {
    async fn request_authorization(&self) -> Result<Authorization, HealthError> {
        let path = self.path.clone();
        let result = tokio::task::spawn_blocking(move || ensure_parent(&path)).await?;
        match result {
            Ok(()) => Ok(Authorization::Granted),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "journal directory is not writable");
                Ok(Authorization::Denied)
            }
        }
    }

    async fn save_in_bed_session(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), HealthError> {
        let sample = InBedSample::new(start, end)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_sample(&path, &sample)).await??;
        tracing::debug!(path = %self.path.display(), %start, %end, "wrote in-bed sample");
        Ok(())
    }
}
