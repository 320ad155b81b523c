//! Versioned encoding for persisted values.
//!
//! Every blob written to the store is wrapped as `{"version": N, "data": ...}`.
//! Blobs without the envelope are version 0: the bare payload written before
//! versioning existed. Both decode; versions newer than [`SCHEMA_VERSION`]
//! are rejected rather than guessed at.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::session::FocusSession;

/// Current persisted schema version.
pub const SCHEMA_VERSION: u64 = 1;

/// Encoding and decoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported schema version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },
    #[error("versioned envelope is missing its data")]
    MissingData,
    #[error("envelope version must be a non-negative integer, got {found}")]
    InvalidVersion { found: Value },
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    version: u64,
    data: &'a T,
}

/// Encodes a value inside the current envelope.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let envelope = Envelope {
        version: SCHEMA_VERSION,
        data: value,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decodes a value written by [`encode`] or a bare legacy payload.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let payload = match value {
        Value::Object(mut object) if object.contains_key("version") => {
            let version = object.remove("version").unwrap_or_default();
            let Some(found) = version.as_u64() else {
                return Err(CodecError::InvalidVersion { found: version });
            };
            if found > SCHEMA_VERSION {
                return Err(CodecError::UnsupportedVersion {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
            object.remove("data").ok_or(CodecError::MissingData)?
        }
        bare => bare,
    };
    Ok(serde_json::from_value(payload)?)
}

/// Renders sessions in the export format: a pretty-printed JSON array.
pub fn export_sessions(sessions: &[FocusSession]) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(sessions)?)
}

/// Parses an export file. Accepts the bare array or a versioned envelope.
pub fn import_sessions(text: &str) -> Result<Vec<FocusSession>, CodecError> {
    decode(text.as_bytes())
}
