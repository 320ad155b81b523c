//! Stop command: close the open session and export its in-bed time.
//!
//! The flow has three phases. Under the session lock the pending session is
//! consumed and stored with `recorded_to_health = false`. The sink is then
//! called without holding the lock, since it may be slow. Only a successful
//! write flips the stored flag; a crash or failure in between leaves the
//! record unexported, which `fsl mark` can correct.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use fsl_core::{FocusSession, KeyValueStore, PreparedSession};
use fsl_health::HealthSink;

use crate::App;
use crate::commands::util::{format_duration, format_local};

/// What happened to the open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    NoActiveSession,
    /// The session ended at or before it started and was dropped.
    Discarded(PreparedSession),
    Stored {
        session: FocusSession,
        export: Export,
    },
}

/// Result of handing the in-bed interval to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    /// The session did not qualify as sleep.
    Ineligible,
    Recorded,
    /// The sink failed; the record stays unexported.
    Failed(String),
    /// The sink accepted the sample but the stored flag could not be set.
    Unmarked(String),
}

/// Runs the completion flow against `sink`.
pub async fn complete<S, Tz, H>(
    app: &App<S, Tz>,
    sink: &H,
    at: DateTime<Utc>,
    focus: Option<String>,
) -> Result<Completion>
where
    S: KeyValueStore,
    Tz: TimeZone,
    H: HealthSink,
{
    let stored = {
        let _lock = app.write_lock()?;
        let Some(prepared) = app
            .manager
            .prepare_completion(at, focus)
            .context("failed to complete focus session")?
        else {
            return Ok(Completion::NoActiveSession);
        };

        if prepared.end_date <= prepared.start_date {
            tracing::warn!(
                id = %prepared.id,
                start = %prepared.start_date,
                end = %prepared.end_date,
                "discarded focus session that ended before it started"
            );
            return Ok(Completion::Discarded(prepared));
        }

        let session = app
            .manager
            .store_completed(FocusSession::from_prepared(&prepared, false))
            .context("failed to store focus session")?;
        (session, prepared.in_bed_interval())
    };

    let (mut session, interval) = stored;
    let Some((start, end)) = interval else {
        return Ok(Completion::Stored {
            session,
            export: Export::Ineligible,
        });
    };

    let export = match sink.save_in_bed_session(start, end).await {
        Ok(()) => match mark_recorded(app, &session) {
            Ok(()) => {
                session.recorded_to_health = true;
                Export::Recorded
            }
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::warn!(id = %session.id, error = %reason, "exported session left unmarked");
                Export::Unmarked(reason)
            }
        },
        Err(err) => {
            tracing::warn!(id = %session.id, error = %err, "health export failed");
            Export::Failed(err.to_string())
        }
    };

    Ok(Completion::Stored { session, export })
}

fn mark_recorded<S: KeyValueStore, Tz: TimeZone>(
    app: &App<S, Tz>,
    session: &FocusSession,
) -> Result<()> {
    let _lock = app.write_lock()?;
    app.manager
        .update_status(session.id, true)
        .context("failed to mark session as recorded")
}

/// Writes a human-readable summary of `completion`.
pub fn render<W: Write, Tz: TimeZone>(
    writer: &mut W,
    completion: &Completion,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    match completion {
        Completion::NoActiveSession => writeln!(writer, "No active focus session.")?,
        Completion::Discarded(prepared) => writeln!(
            writer,
            "Discarded session {}: it ended at {}, before it started.",
            prepared.id,
            format_local(prepared.end_date, tz)
        )?,
        Completion::Stored { session, export } => {
            writeln!(
                writer,
                "Stopped focus session {} after {}",
                session.id,
                format_duration(session.duration())
            )?;
            match export {
                Export::Ineligible => {
                    writeln!(writer, "Not a sleep session; nothing exported.")?;
                }
                Export::Recorded => render_in_bed(writer, session, tz)?,
                Export::Unmarked(reason) => {
                    render_in_bed(writer, session, tz)?;
                    writeln!(writer, "Could not mark the session as recorded: {reason}")?;
                    writeln!(writer, "Run: fsl mark {} --recorded", session.id)?;
                }
                Export::Failed(reason) => {
                    writeln!(writer, "Could not export in-bed time: {reason}")?;
                    writeln!(
                        writer,
                        "Once recorded elsewhere, run: fsl mark {} --recorded",
                        session.id
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn render_in_bed<W: Write, Tz: TimeZone>(
    writer: &mut W,
    session: &FocusSession,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    if let (Some(start), Some(end), Some(duration)) = (
        session.recorded_start_date,
        session.recorded_end_date,
        session.recorded_duration(),
    ) {
        writeln!(
            writer,
            "Recorded in bed {} -> {} ({})",
            format_local(start, tz),
            format_local(end, tz),
            format_duration(duration)
        )?;
    }
    Ok(())
}

/// Completes the open session and prints the outcome.
pub fn run<W, S, Tz, H>(
    writer: &mut W,
    app: &App<S, Tz>,
    sink: &H,
    at: DateTime<Utc>,
    focus: Option<String>,
) -> Result<()>
where
    W: Write,
    S: KeyValueStore,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    H: HealthSink,
{
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let completion = runtime.block_on(complete(app, sink, at, focus))?;
    render(writer, &completion, app.manager.time_zone())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use fsl_core::store::SESSION_HISTORY_KEY;
    use fsl_core::{MemoryStore, SessionManager};
    use fsl_health::{Authorization, HealthError};
    use insta::assert_snapshot;

    #[derive(Default)]
    struct RecordingSink {
        saved: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
        fail: bool,
    }

    impl HealthSink for RecordingSink {
        async fn request_authorization(&self) -> Result<Authorization, HealthError> {
            Ok(Authorization::Granted)
        }

        async fn save_in_bed_session(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<(), HealthError> {
            if self.fail {
                return Err(HealthError::Rejected {
                    status: 503,
                    message: "store unavailable".to_string(),
                });
            }
            self.saved.lock().unwrap().push((start, end));
            Ok(())
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn app() -> App<MemoryStore, Utc> {
        App::detached(SessionManager::with_time_zone(MemoryStore::new(), Utc))
    }

    #[tokio::test]
    async fn no_active_session() {
        let app = app();
        let sink = RecordingSink::default();
        let completion = complete(&app, &sink, ts("2024-01-02T02:30:00Z"), None)
            .await
            .unwrap();
        assert_eq!(completion, Completion::NoActiveSession);
        assert!(sink.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn overnight_session_is_exported_and_marked() {
        let app = app();
        let sink = RecordingSink::default();
        app.manager
            .start(ts("2024-01-01T23:00:00Z"), Some("Sleep".to_string()))
            .unwrap();

        let completion = complete(&app, &sink, ts("2024-01-02T02:30:00Z"), None)
            .await
            .unwrap();

        let Completion::Stored { session, export } = &completion else {
            panic!("unexpected completion: {completion:?}");
        };
        assert_eq!(*export, Export::Recorded);
        assert!(session.recorded_to_health);
        assert_eq!(
            *sink.saved.lock().unwrap(),
            vec![(ts("2024-01-02T01:00:00Z"), ts("2024-01-02T02:30:00Z"))]
        );
        let history = app.manager.load_history().unwrap();
        assert_eq!(history, vec![session.clone()]);

        let mut output = Vec::new();
        render(&mut output, &completion, &Utc).unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(&session.id.to_string(), "[id]");
        assert_snapshot!(output, @r"
        Stopped focus session [id] after 3h 30m
        Recorded in bed 2024-01-02 01:00 -> 2024-01-02 02:30 (1h 30m)
        ");
    }

    #[tokio::test]
    async fn daytime_session_is_stored_without_export() {
        let app = app();
        let sink = RecordingSink::default();
        app.manager.start(ts("2024-01-01T09:00:00Z"), None).unwrap();

        let completion = complete(&app, &sink, ts("2024-01-01T10:00:00Z"), None)
            .await
            .unwrap();

        assert!(matches!(
            completion,
            Completion::Stored {
                export: Export::Ineligible,
                ..
            }
        ));
        assert!(sink.saved.lock().unwrap().is_empty());
        let history = app.manager.load_history().unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].recorded_to_health);
        assert_eq!(history[0].recorded_start_date, None);
    }

    #[tokio::test]
    async fn sink_failure_keeps_record_unexported() {
        let app = app();
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        app.manager.start(ts("2024-01-01T23:00:00Z"), None).unwrap();

        let completion = complete(&app, &sink, ts("2024-01-02T02:30:00Z"), None)
            .await
            .unwrap();

        let Completion::Stored { session, export } = &completion else {
            panic!("unexpected completion: {completion:?}");
        };
        assert!(matches!(export, Export::Failed(reason) if reason.contains("store unavailable")));
        let history = app.manager.load_history().unwrap();
        assert!(!history[0].recorded_to_health);
        assert_eq!(
            history[0].recorded_start_date,
            Some(ts("2024-01-02T01:00:00Z"))
        );

        let mut output = Vec::new();
        render(&mut output, &completion, &Utc).unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(&session.id.to_string(), "[id]");
        assert_snapshot!(output, @r"
        Stopped focus session [id] after 3h 30m
        Could not export in-bed time: sink rejected sample: store unavailable
        Once recorded elsewhere, run: fsl mark [id] --recorded
        ");
    }

    /// Accepts the sample, then leaves history in a format this build cannot rewrite.
    struct OutdatingSink<'a> {
        app: &'a App<MemoryStore, Utc>,
    }

    impl HealthSink for OutdatingSink<'_> {
        async fn request_authorization(&self) -> Result<Authorization, HealthError> {
            Ok(Authorization::Granted)
        }

        async fn save_in_bed_session(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<(), HealthError> {
            self.app
                .manager
                .with_store(|store| store.set(SESSION_HISTORY_KEY, br#"{"version":2,"data":[]}"#))
                .unwrap()
                .unwrap();
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_marking_after_export_reports_unmarked() {
        let app = app();
        let sink = OutdatingSink { app: &app };
        app.manager.start(ts("2024-01-01T23:00:00Z"), None).unwrap();

        let completion = complete(&app, &sink, ts("2024-01-02T02:30:00Z"), None)
            .await
            .unwrap();

        let Completion::Stored { session, export } = &completion else {
            panic!("unexpected completion: {completion:?}");
        };
        assert!(
            matches!(export, Export::Unmarked(reason) if reason.contains("unsupported schema version 2"))
        );
        assert!(!session.recorded_to_health);

        let mut output = Vec::new();
        render(&mut output, &completion, &Utc).unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(&session.id.to_string(), "[id]");
        assert_snapshot!(output, @r"
        Stopped focus session [id] after 3h 30m
        Recorded in bed 2024-01-02 01:00 -> 2024-01-02 02:30 (1h 30m)
        Could not mark the session as recorded: failed to mark session as recorded: unsupported schema version 2 (newest supported is 1)
        Run: fsl mark [id] --recorded
        ");
    }

    #[tokio::test]
    async fn inverted_session_is_discarded() {
        let app = app();
        let sink = RecordingSink::default();
        app.manager.start(ts("2024-01-02T02:00:00Z"), None).unwrap();

        let completion = complete(&app, &sink, ts("2024-01-02T01:00:00Z"), None)
            .await
            .unwrap();

        assert!(matches!(completion, Completion::Discarded(_)));
        assert!(app.manager.load_history().unwrap().is_empty());
        assert!(!app.manager.has_active_session().unwrap());
    }

    #[test]
    fn run_prints_when_nothing_is_open() {
        let app = app();
        let mut output = Vec::new();
        run(
            &mut output,
            &app,
            &RecordingSink::default(),
            ts("2024-01-02T02:30:00Z"),
            None,
        )
        .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No active focus session.\n");
    }
}
