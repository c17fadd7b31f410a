//! `nocdash-proxy` — reverse proxy for the NOC dashboard.
//!
//! Serves the built web UI and relays `/api/*` + `/health` to the alarm
//! aggregation backend, including chunk-by-chunk SSE relay for
//! investigation streams. Configuration comes from the shared TOML
//! config with `NOCDASH_*` overrides; the bare `PORT` and `BACKEND_URL`
//! variables the container environment sets win over everything.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nocdash_proxy::{ProxyState, app};

/// Reverse proxy serving the NOC dashboard UI and backend API.
#[derive(Parser, Debug)]
#[command(name = "nocdash-proxy", version, about)]
struct Cli {
    /// Config file path (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the built web UI (overrides the config file)
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("nocdash_proxy=info,tower_http=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => nocdash_config::load_config_from(path)?,
        None => nocdash_config::load_config()?,
    };
    let static_dir = cli.static_dir.or_else(|| config.proxy.static_dir.clone());

    let state = ProxyState::new(&config.backend_url);
    let router = app(state, static_dir.as_deref());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.proxy.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, backend = %config.backend_url, static_dir = ?static_dir, "proxy listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
