//! # herald
//!
//! Push hub server binary: loads settings, starts the HTTP/WebSocket server,
//! and drains every connection on Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use herald_core::logging::{LogFormat, init_subscriber};
use herald_server::{HeraldServer, ServerConfig};
use herald_settings::HeraldSettings;
use tracing::{info, warn};

/// Herald push hub.
#[derive(Parser, Debug)]
#[command(name = "herald", about = "Real-time push delivery hub")]
struct Cli {
    /// Settings file (defaults to `~/.herald/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Per-connection mailbox capacity.
    #[arg(long)]
    mailbox_capacity: Option<usize>,

    /// Log filter directive, e.g. `info` or `herald_hub=debug`.
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format (`compact` or `json`).
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Apply flags on top of loaded settings.
    fn apply(&self, settings: &mut HeraldSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(capacity) = self.mailbox_capacity {
            settings.hub.mailbox_capacity = capacity;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(herald_settings::settings_path);
    let mut settings = herald_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);
    settings.validate().context("Invalid settings")?;

    init_subscriber(&settings.logging.level, settings.logging.format);

    let metrics_handle =
        herald_server::metrics::install_recorder().context("Failed to install metrics recorder")?;
    let server = HeraldServer::new(ServerConfig::from_settings(&settings), metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to start server")?;
    info!(
        mailbox_capacity = settings.hub.mailbox_capacity,
        "Herald listening on http://{addr}"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("Shutting down...");
    if !server.shutdown_gracefully().await {
        warn!("some sessions did not close before the shutdown timeout");
    }
    let _ = handle.await;

    info!("Shutdown complete");
    Ok(())
}
