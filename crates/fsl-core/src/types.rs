//! Core type definitions with validation.

use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A session ended at or before the moment it started.
    #[error("session {id} ends at or before its start")]
    EmptyInterval { id: Uuid },

    /// Only one of the two recorded bounds was present.
    #[error("session {id} has a partial recorded interval")]
    PartialRecordedInterval { id: Uuid },

    /// The recorded interval is empty or inverted.
    #[error("session {id} has an empty recorded interval")]
    EmptyRecordedInterval { id: Uuid },

    /// A session was marked as exported without a recorded interval.
    #[error("session {id} cannot be marked recorded without a recorded interval")]
    NotRecordable { id: Uuid },

    /// The night boundary was outside `0..=1439`.
    #[error("night boundary must be between 0 and 1439 minutes, got {value}")]
    BoundaryOutOfRange { value: i64 },

    /// The night boundary text was not `HH:MM`.
    #[error("invalid night boundary {value:?}, expected HH:MM")]
    InvalidBoundaryFormat { value: String },

    /// The same id appeared twice in one batch.
    #[error("duplicate session id {id}")]
    DuplicateId { id: Uuid },
}
