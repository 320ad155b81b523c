//! Focus sessions: the open pending slot, prepared completions and stored records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ValidationError;

/// The single in-flight focus interval.
///
/// Lives only in the pending slot between `start` and the next
/// `complete`/`abandon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSession {
    pub id: Uuid,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub focus_name: Option<String>,
}

impl PendingSession {
    /// Creates a pending session with a fresh id.
    pub fn new(start_date: DateTime<Utc>, focus_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_date,
            focus_name,
        }
    }
}

/// A completed focus interval after boundary evaluation, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSession {
    pub id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub focus_name: Option<String>,
    pub recorded_start_date: Option<DateTime<Utc>>,
    pub recorded_end_date: Option<DateTime<Utc>>,
    pub eligible_for_health_export: bool,
}

impl PreparedSession {
    /// The trimmed in-bed interval, present only when eligible.
    pub fn in_bed_interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.eligible_for_health_export {
            return None;
        }
        self.recorded_start_date.zip(self.recorded_end_date)
    }
}

/// A completed session record as stored in history and exported.
///
/// The serialized field names are the export/import schema; optional fields
/// serialize as `null` rather than being omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub focus_name: Option<String>,
    pub recorded_start_date: Option<DateTime<Utc>>,
    pub recorded_end_date: Option<DateTime<Utc>>,
    pub recorded_to_health: bool,
}

impl FocusSession {
    /// Total length of the focus interval.
    pub fn duration(&self) -> Duration {
        self.end_date - self.start_date
    }

    /// Length of the recorded in-bed interval, if any.
    pub fn recorded_duration(&self) -> Option<Duration> {
        let (start, end) = self.recorded_start_date.zip(self.recorded_end_date)?;
        Some(end - start)
    }

    /// Builds the stored record for a prepared completion.
    pub fn from_prepared(prepared: &PreparedSession, recorded_to_health: bool) -> Self {
        Self {
            id: prepared.id,
            start_date: prepared.start_date,
            end_date: prepared.end_date,
            focus_name: prepared.focus_name.clone(),
            recorded_start_date: prepared.recorded_start_date,
            recorded_end_date: prepared.recorded_end_date,
            recorded_to_health,
        }
    }

    /// Checks the record invariants.
    ///
    /// - `end_date > start_date`
    /// - recorded bounds are both present or both absent, and non-empty
    /// - `recorded_to_health` implies a recorded interval
    pub fn validate(&self) -> Result<(), ValidationError> {
        let id = self.id;
        if self.end_date <= self.start_date {
            return Err(ValidationError::EmptyInterval { id });
        }
        match (self.recorded_start_date, self.recorded_end_date) {
            (Some(start), Some(end)) => {
                if end <= start {
                    return Err(ValidationError::EmptyRecordedInterval { id });
                }
            }
            (None, None) => {
                if self.recorded_to_health {
                    return Err(ValidationError::NotRecordable { id });
                }
            }
            _ => return Err(ValidationError::PartialRecordedInterval { id }),
        }
        Ok(())
    }
}
