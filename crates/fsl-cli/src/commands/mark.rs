//! Mark command: correct the recorded-to-health flag of a stored session.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;
use fsl_core::KeyValueStore;
use uuid::Uuid;

use crate::App;

pub fn run<W: Write, S: KeyValueStore, Tz: TimeZone>(
    writer: &mut W,
    app: &App<S, Tz>,
    id: Uuid,
    recorded: bool,
) -> Result<()> {
    let _lock = app.write_lock()?;
    let known = app
        .manager
        .load_history()
        .context("failed to read history")?
        .iter()
        .any(|session| session.id == id);
    if !known {
        writeln!(writer, "No stored session with id {id}; nothing changed.")?;
        return Ok(());
    }

    app.manager
        .update_status(id, recorded)
        .with_context(|| format!("failed to update session {id}"))?;
    let label = if recorded { "recorded" } else { "not recorded" };
    writeln!(writer, "Marked session {id} as {label}.")?;
    Ok(())
}
