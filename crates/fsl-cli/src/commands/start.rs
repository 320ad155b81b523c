//! Start command: open a focus session.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use fsl_core::KeyValueStore;

use crate::App;
use crate::commands::util::format_local;

pub fn run<W: Write, S: KeyValueStore, Tz: TimeZone>(
    writer: &mut W,
    app: &App<S, Tz>,
    at: DateTime<Utc>,
    focus: Option<String>,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let _lock = app.write_lock()?;
    let replaced = app.manager.active_session().transpose();
    let id = app
        .manager
        .start(at, focus)
        .context("failed to start focus session")?;

    match replaced {
        Some(Ok(old)) => writeln!(writer, "Replaced open session {}", old.id)?,
        Some(Err(err)) => {
            tracing::warn!(error = %err, "replaced an unreadable open session");
            writeln!(writer, "Replaced an unreadable open session ({err})")?;
        }
        None => {}
    }
    writeln!(
        writer,
        "Started focus session {id} at {}",
        format_local(at, app.manager.time_zone())
    )?;
    Ok(())
}
