//! History command: list stored sessions, optionally following changes.

use std::io::Write;
use std::thread;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::TimeZone;
use fsl_core::store::{PENDING_SESSION_KEY, SESSION_HISTORY_KEY};
use fsl_core::{ChangeWatcher, FocusSession, KeyValueStore};

use crate::App;
use crate::commands::util::{format_duration, format_local};

/// Renders sessions newest first, one per line.
pub fn render<W: Write, Tz: TimeZone>(
    writer: &mut W,
    sessions: &[FocusSession],
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    if sessions.is_empty() {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    }

    for session in sessions {
        let name = session.focus_name.as_deref().unwrap_or("Focus");
        write!(
            writer,
            "{}  {} -> {}  {:<10} {:>7}",
            session.id,
            format_local(session.start_date, tz),
            format_local(session.end_date, tz),
            name,
            format_duration(session.duration())
        )?;
        match session.recorded_duration() {
            Some(in_bed) => {
                let marker = if session.recorded_to_health {
                    "recorded"
                } else {
                    "not recorded"
                };
                writeln!(writer, "  in bed {}, {marker}", format_duration(in_bed))?;
            }
            None => writeln!(writer)?,
        }
    }
    Ok(())
}

pub fn run<W: Write, S: KeyValueStore, Tz: TimeZone>(
    writer: &mut W,
    app: &App<S, Tz>,
    json: bool,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let sessions = app.manager.load_history().context("failed to read history")?;
    if json {
        serde_json::to_writer_pretty(&mut *writer, &sessions)?;
        writeln!(writer)?;
    } else {
        render(writer, &sessions, app.manager.time_zone())?;
    }
    Ok(())
}

/// Re-renders history whenever another process changes it. Runs until killed.
pub fn follow<W: Write, S: KeyValueStore, Tz: TimeZone>(
    writer: &mut W,
    app: &App<S, Tz>,
    json: bool,
    interval: StdDuration,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let keys = [SESSION_HISTORY_KEY, PENDING_SESSION_KEY];
    let mut watcher = app
        .manager
        .with_store(|store| ChangeWatcher::new(store, &keys))?
        .context("failed to read store revisions")?;

    run(writer, app, json)?;
    writer.flush()?;
    loop {
        thread::sleep(interval);
        let changed = app
            .manager
            .with_store(|store| watcher.poll(store))?
            .context("failed to poll store revisions")?;
        if changed.is_empty() {
            continue;
        }
        tracing::debug!(?changed, "store changed");
        if changed.contains(&SESSION_HISTORY_KEY) {
            writeln!(writer)?;
            run(writer, app, json)?;
        } else if !json {
            let open = app.manager.has_active_session()?;
            writeln!(
                writer,
                "{}",
                if open {
                    "A focus session is open."
                } else {
                    "No focus session is open."
                }
            )?;
        }
        writer.flush()?;
    }
}
