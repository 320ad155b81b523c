//! Import command: merge an export file into history.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::TimeZone;
use fsl_core::{KeyValueStore, codec};

use crate::App;

pub fn run<W: Write, S: KeyValueStore, Tz: TimeZone>(
    writer: &mut W,
    app: &App<S, Tz>,
    path: &Path,
) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let sessions = codec::import_sessions(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let total = sessions.len();

    let _lock = app.write_lock()?;
    let added = app
        .manager
        .import_history(sessions)
        .context("failed to import sessions")?;

    writeln!(
        writer,
        "Imported {added} of {total} sessions ({} skipped)",
        total - added
    )?;
    Ok(())
}
