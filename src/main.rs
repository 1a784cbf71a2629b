//! Tailspin Toys catalog API server.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request_logging (correlation ID, "Incoming request")
//!                      → timeout / body limit / panic capture
//!                      → /api/games, /api/games/{id}      → SQLite catalog
//!                      → /api/debug/leak* (if enabled)    → leak bucket
//!     ◀────────────── request_logging ("Request completed", X-Correlation-ID)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use tailspin_api::config::load_config;
use tailspin_api::lifecycle::{self, signals, Shutdown};
use tailspin_api::observability::init_logging;
use tailspin_api::HttpServer;

#[derive(Parser)]
#[command(name = "tailspin-api")]
#[command(about = "Tailspin Toys game catalog API", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "TAILSPIN_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        environment = %config.logging.environment,
        debug_endpoints = config.debug.endpoints_enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = lifecycle::initialize(config).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(state);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        signals::wait_for_termination().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
