//! `nocdash-tui` — terminal dashboard for NOC alarm monitoring.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `nocdash-core`'s [`Session`](nocdash_core::Session). Screens are
//! navigable via number keys (1-3): Instances, Alarms, and
//! Investigation.
//!
//! Logs are written to a file (default `/tmp/nocdash-tui.log`) to avoid
//! corrupting the terminal UI. A background data bridge task
//! continuously streams store updates into the TUI action loop.
//!
//! Entry point: CLI argument parsing, tracing setup, panic hooks, and
//! app launch.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use nocdash_core::Session;

use crate::app::App;

/// Terminal dashboard for NOC alarm monitoring and AI investigations.
#[derive(Parser, Debug)]
#[command(name = "nocdash-tui", version, about)]
struct Cli {
    /// Alarm backend URL (e.g., http://localhost:13001)
    #[arg(short, long, env = "BACKEND_URL")]
    backend_url: Option<String>,

    /// Config file path (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file path (defaults to /tmp/nocdash-tui.log)
    #[arg(long, default_value = "/tmp/nocdash-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that
/// would corrupt the TUI output. Returns a guard that must be held for
/// the lifetime of the application to ensure logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("nocdash_tui={log_level},nocdash_core={log_level}"))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("nocdash-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    let config = match &cli.config {
        Some(path) => nocdash_config::load_config_from(path)?,
        None => nocdash_config::load_config()?,
    };
    let mut session_config = config.to_session_config();
    if let Some(url) = &cli.backend_url {
        session_config.backend_url.clone_from(url);
    }

    info!(backend = %session_config.backend_url, "starting nocdash-tui");

    let session = Session::new(session_config)?;

    // Restore the filters the operator had last time.
    let saved_filters = nocdash_config::load_filters();
    if saved_filters != nocdash_core::AlarmFilters::default() {
        session.set_filters(saved_filters);
    }

    session.start().await;

    let mut app = App::new(session.clone());
    let result = app.run().await;

    // Persist filters for the next run, then stop polling.
    if let Err(e) = nocdash_config::save_filters(&session.store().filters()) {
        tracing::warn!(error = %e, "failed to persist alarm filters");
    }
    session.shutdown().await;

    result
}
