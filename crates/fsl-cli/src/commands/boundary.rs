//! Boundary command: show or set the night boundary.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;
use fsl_core::{KeyValueStore, NightBoundary};

use crate::App;

pub fn run<W: Write, S: KeyValueStore, Tz: TimeZone>(
    writer: &mut W,
    app: &App<S, Tz>,
    time: Option<&str>,
) -> Result<()> {
    let Some(time) = time else {
        let boundary = app
            .manager
            .night_boundary()
            .context("failed to read night boundary")?;
        writeln!(writer, "Night boundary: {boundary}")?;
        return Ok(());
    };

    let boundary: NightBoundary = time
        .parse()
        .with_context(|| format!("invalid night boundary {time:?}, expected HH:MM"))?;
    let _lock = app.write_lock()?;
    app.manager
        .set_night_boundary(boundary)
        .context("failed to save night boundary")?;
    writeln!(writer, "Night boundary set to {boundary}")?;
    Ok(())
}
