//! Focus sleep CLI library.
//!
//! This crate provides the `fsl` command-line interface: the trigger that
//! opens and closes focus sessions and the reader that lists history.

mod app;
mod cli;
pub mod commands;
mod config;

pub use app::{App, WriteLock};
pub use cli::{Cli, Commands};
pub use config::{Config, HealthConfig, SinkKind};
