//! Errors raised by session lifecycle operations.

use thiserror::Error;

use crate::codec::CodecError;
use crate::store::StoreError;
use crate::types::ValidationError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The pending slot was consumed but its contents could not be decoded.
    ///
    /// The slot is already empty at this point; `raw` is the only copy left.
    #[error("pending session could not be decoded ({source}); raw record: {raw}")]
    CorruptPendingSession {
        raw: String,
        #[source]
        source: CodecError,
    },
}
