use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fsl_cli::commands::{
    abandon, authorize, boundary, export, history, import, mark, start, status, stop, util,
};
use fsl_cli::{App, Cli, Commands, Config};

/// Load config and open the session store.
fn open_app(config_path: Option<&Path>) -> Result<(App<fsl_db::Database>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let app = App::open(&config)?;
    Ok((app, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so `export` and `history --json` stay machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let now = Utc::now();

    match cli.command {
        Some(Commands::Start { focus, at }) => {
            let (app, _config) = open_app(cli.config.as_deref())?;
            let at = util::resolve_at(at.as_deref(), now)?;
            start::run(&mut out, &app, at, focus)?;
        }
        Some(Commands::Stop { focus, at }) => {
            let (app, config) = open_app(cli.config.as_deref())?;
            let at = util::resolve_at(at.as_deref(), now)?;
            let sink = config
                .build_sink()
                .context("failed to configure health sink")?;
            stop::run(&mut out, &app, &sink, at, focus)?;
        }
        Some(Commands::Abandon) => {
            let (app, _config) = open_app(cli.config.as_deref())?;
            abandon::run(&mut out, &app)?;
        }
        Some(Commands::Status) => {
            let (app, config) = open_app(cli.config.as_deref())?;
            let time_zone = status::system_time_zone();
            status::run(
                &mut out,
                &app,
                status::StatusInfo {
                    time_zone: &time_zone,
                    sink: config.health.sink.as_str(),
                    now,
                },
            )?;
        }
        Some(Commands::History {
            json,
            follow,
            interval,
        }) => {
            let (app, _config) = open_app(cli.config.as_deref())?;
            if follow {
                history::follow(&mut out, &app, json, Duration::from_secs(interval.max(1)))?;
            } else {
                history::run(&mut out, &app, json)?;
            }
        }
        Some(Commands::Boundary { time }) => {
            let (app, _config) = open_app(cli.config.as_deref())?;
            boundary::run(&mut out, &app, time.as_deref())?;
        }
        Some(Commands::Mark {
            id,
            recorded,
            not_recorded: _,
        }) => {
            let (app, _config) = open_app(cli.config.as_deref())?;
            mark::run(&mut out, &app, id, recorded)?;
        }
        Some(Commands::Export { output }) => {
            let (app, _config) = open_app(cli.config.as_deref())?;
            export::run(&mut out, &app, output.as_deref())?;
        }
        Some(Commands::Import { path }) => {
            let (app, _config) = open_app(cli.config.as_deref())?;
            import::run(&mut out, &app, &path)?;
        }
        Some(Commands::Authorize) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            let sink = config
                .build_sink()
                .context("failed to configure health sink")?;
            authorize::run(&mut out, &sink, sink.name())?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    out.flush()?;
    Ok(())
}
