//! Status command for showing the open session and current settings.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use fsl_core::KeyValueStore;

use crate::App;
use crate::commands::util::{format_duration, format_local};

/// Environment details shown alongside session state.
#[derive(Debug, Clone, Copy)]
pub struct StatusInfo<'a> {
    pub time_zone: &'a str,
    pub sink: &'a str,
    pub now: DateTime<Utc>,
}

/// Best-effort IANA name of the system time zone.
pub fn system_time_zone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|err| {
        tracing::debug!(error = %err, "could not determine time zone name");
        "local".to_string()
    })
}

pub fn run<W: Write, S: KeyValueStore, Tz: TimeZone>(
    writer: &mut W,
    app: &App<S, Tz>,
    info: StatusInfo<'_>,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let tz = app.manager.time_zone();
    let boundary = app
        .manager
        .night_boundary()
        .context("failed to read night boundary")?;
    let active = app
        .manager
        .active_session()
        .context("failed to read the open session")?;
    let history = app.manager.load_history().context("failed to read history")?;

    writeln!(writer, "Focus sleep status")?;
    if let Some(path) = app.database_path() {
        writeln!(writer, "Database: {}", path.display())?;
    }
    writeln!(writer, "Time zone: {}", info.time_zone)?;
    writeln!(writer, "Night boundary: {boundary}")?;
    writeln!(writer, "Health sink: {}", info.sink)?;

    match active {
        Some(pending) => {
            write!(
                writer,
                "Open session: {} since {}",
                pending.id,
                format_local(pending.start_date, tz)
            )?;
            if let Some(name) = &pending.focus_name {
                write!(writer, " ({name})")?;
            }
            writeln!(
                writer,
                ", {} so far",
                format_duration(info.now - pending.start_date)
            )?;
        }
        None => writeln!(writer, "Open session: none")?,
    }

    let recorded = history.iter().filter(|s| s.recorded_to_health).count();
    writeln!(
        writer,
        "Stored sessions: {} ({recorded} recorded to health)",
        history.len()
    )?;

    Ok(())
}
