//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the catalog store and make sure its schema exists
//! - Seed sample data when configured
//! - Start the metrics listener when configured
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::{AddrParseError, SocketAddr};

use metrics_exporter_prometheus::BuildError;

use crate::catalog::CatalogRepository;
use crate::config::AppConfig;
use crate::http::AppState;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),
    #[error("metrics exporter error: {0}")]
    Metrics(#[from] BuildError),
}

/// Build the shared application state from validated configuration.
pub async fn initialize(config: AppConfig) -> Result<AppState, StartupError> {
    let catalog = CatalogRepository::connect(&config.database).await?;
    catalog.init_schema().await?;
    tracing::info!(max_connections = config.database.max_connections, "Catalog store ready");

    if config.database.seed_sample_data {
        let inserted = catalog.seed_sample_data().await?;
        tracing::info!(games = inserted, "Sample catalog seeded");
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    Ok(AppState::new(config, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_in_memory() {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".into();
        config.database.seed_sample_data = true;

        let state = initialize(config).await.unwrap();
        assert!(!state.catalog.list_games().await.unwrap().is_empty());
        assert_eq!(state.leak_bucket.stats().chunks, 0);
    }
}
