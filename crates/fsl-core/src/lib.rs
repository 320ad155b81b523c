//! Core domain logic for focus sleep tracking.
//!
//! This crate contains:
//! - Boundary evaluation: which part of a focus interval counts as in-bed time
//! - The session lifecycle manager owning the pending slot and history
//! - The key-value contract every storage backend implements
//! - Versioned encoding for persisted records and exports

pub mod boundary;
pub mod codec;
mod config_store;
mod error;
pub mod history;
mod manager;
mod session;
pub mod store;
mod types;
pub mod watch;

pub use boundary::{Eligibility, IneligibleReason, NightBoundary, evaluate};
pub use codec::CodecError;
pub use config_store::ConfigStore;
pub use error::SessionError;
pub use history::{HISTORY_CAPACITY, History, HistoryStore};
pub use manager::SessionManager;
pub use session::{FocusSession, PendingSession, PreparedSession};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use types::ValidationError;
pub use watch::ChangeWatcher;
