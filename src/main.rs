//! Multi-Client File/Metadata Management Server - Entry Point
//!
//! Initializes logging, builds the server from the environment, and serves
//! until Ctrl-C.

use std::env;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use metadata_server::{Server, ServerConfig, ServerState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=metadata_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("metadata_server=info")),
        )
        .init();

    // Environment configuration; first CLI argument overrides the address
    let mut config = ServerConfig::from_env();
    if let Some(addr) = env::args().nth(1) {
        config.bind_addr = addr;
    }

    let base_dir = env::current_dir()?;
    let state = ServerState::new(base_dir);
    let server = Server::new(config, state);

    // Ctrl-C flips the shutdown signal; the server drains and exits
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            let _ = shutdown_tx.send(true);
        }
    });

    if let Err(e) = server.run(shutdown_rx).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
