//! CLI subcommand implementations.

pub mod abandon;
pub mod authorize;
pub mod boundary;
pub mod export;
pub mod history;
pub mod import;
pub mod mark;
pub mod start;
pub mod status;
pub mod stop;
pub mod util;
