//! Export command: write history in the interchange format.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::TimeZone;
use fsl_core::{KeyValueStore, codec};

use crate::App;

/// Writes history to `output`, or to `writer` when no path is given.
pub fn run<W: Write, S: KeyValueStore, Tz: TimeZone>(
    writer: &mut W,
    app: &App<S, Tz>,
    output: Option<&Path>,
) -> Result<()> {
    let sessions = app.manager.load_history().context("failed to read history")?;
    let text = codec::export_sessions(&sessions).context("failed to encode history")?;

    match output {
        Some(path) => {
            fs::write(path, format!("{text}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), count = sessions.len(), "exported history");
            writeln!(writer, "Exported {} sessions to {}", sessions.len(), path.display())?;
        }
        None => writeln!(writer, "{text}")?,
    }
    Ok(())
}
