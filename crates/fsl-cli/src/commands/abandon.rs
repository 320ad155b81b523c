//! Abandon command: drop the open session.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;
use fsl_core::KeyValueStore;

use crate::App;

pub fn run<W: Write, S: KeyValueStore, Tz: TimeZone>(writer: &mut W, app: &App<S, Tz>) -> Result<()> {
    let _lock = app.write_lock()?;
    let removed = app
        .manager
        .abandon()
        .context("failed to abandon focus session")?;
    if removed {
        writeln!(writer, "Abandoned the open focus session.")?;
    } else {
        writeln!(writer, "No active focus session.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use fsl_core::{MemoryStore, SessionManager};

    #[test]
    fn abandon_is_idempotent() {
        let app = App::detached(SessionManager::with_time_zone(MemoryStore::new(), Utc));
        app.manager.start(Utc::now(), None).unwrap();

        let mut output = Vec::new();
        run(&mut output, &app).unwrap();
        run(&mut output, &app).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Abandoned the open focus session.\nNo active focus session.\n"
        );
        assert!(app.manager.load_history().unwrap().is_empty());
    }
}
