//! uplink server daemon.
//!
//! Boots an [`UplinkServer`] from defaults, `UPLINK_*` environment
//! overrides, and command-line flags, then serves until Ctrl-C.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use uplink_server::{ServerConfig, UplinkServer};

#[derive(Debug, Parser)]
#[command(name = "uplinkd", about = "Notification channel and artifact intake server", version)]
struct Cli {
    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind; 0 picks a free port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory artifacts are stored in.
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Log filter, e.g. `info` or `uplink_server=debug`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Flags win over whatever the config already holds.
fn apply_cli_overrides(mut config: ServerConfig, cli: &Cli) -> ServerConfig {
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = &cli.upload_dir {
        config.upload_dir = dir.clone();
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber(&cli.log_level);

    let config = apply_cli_overrides(ServerConfig::default().apply_env_overrides(), &cli);
    let grace = config.shutdown_grace();

    let server = UplinkServer::new(config);
    let (addr, serve) = server.listen().await.context("server failed to start")?;
    tracing::info!(%addr, "uplinkd running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");

    server.shutdown().graceful_shutdown(vec![serve], grace).await;
    server.registry().close_all();
    Ok(())
}
