//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use uuid::Uuid;

/// Focus sleep tracker.
///
/// Turns focus sessions that run across the night into in-bed samples for a
/// health store.
#[derive(Debug, Parser)]
#[command(name = "fsl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open a focus session.
    Start {
        /// Name of the focus mode.
        #[arg(long)]
        focus: Option<String>,

        /// When the session started (ISO 8601 or relative like "2 hours ago").
        #[arg(long)]
        at: Option<String>,
    },

    /// Close the open focus session and export its in-bed time.
    Stop {
        /// Name of the focus mode; overrides the one given at start.
        #[arg(long)]
        focus: Option<String>,

        /// When the session ended (ISO 8601 or relative like "5 minutes ago").
        #[arg(long)]
        at: Option<String>,
    },

    /// Drop the open focus session without recording it.
    Abandon,

    /// Show the open session, night boundary and storage locations.
    Status,

    /// List stored sessions, newest first.
    History {
        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Keep running and re-render when another process changes history.
        #[arg(long)]
        follow: bool,

        /// Polling interval for --follow, in seconds.
        #[arg(long, default_value = "2", requires = "follow")]
        interval: u64,
    },

    /// Show or set the night boundary (HH:MM local time).
    Boundary {
        /// New boundary, e.g. 01:00.
        time: Option<String>,
    },

    /// Correct whether a session was recorded to the health store.
    #[command(group(ArgGroup::new("status").required(true).args(["recorded", "not_recorded"])))]
    Mark {
        /// Session id.
        id: Uuid,

        /// Mark as recorded.
        #[arg(long)]
        recorded: bool,

        /// Mark as not recorded.
        #[arg(long)]
        not_recorded: bool,
    },

    /// Export history as a JSON array.
    Export {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import sessions from an export file.
    Import {
        /// Path to the export file.
        path: PathBuf,
    },

    /// Ask the configured health sink for write access.
    Authorize,
}
