//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request logging, timeout, body limit, panic capture)
//! - Bind server to listener
//! - Stop accepting on shutdown and drain in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::catalog::{self, CatalogRepository};
use crate::config::AppConfig;
use crate::debug::{self, LeakBucket};
use crate::http::middleware::request_logging_middleware;
use crate::http::response::handle_panic;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: CatalogRepository,
    pub leak_bucket: Arc<LeakBucket>,
}

impl AppState {
    pub fn new(config: AppConfig, catalog: CatalogRepository) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            leak_bucket: Arc::new(LeakBucket::new()),
        }
    }
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        let mut router = Router::new().merge(catalog::routes());
        if config.debug.endpoints_enabled {
            tracing::warn!("Debug endpoints enabled");
            router = router.merge(debug::routes());
        }

        Self::with_middleware(router.with_state(state), &config)
    }

    /// Wrap `router` in the service middleware stack.
    ///
    /// Request logging is the outermost layer so that timeouts, oversized
    /// bodies and caught panics are logged with their final status. Each
    /// layer is applied on its own so the body limit's `Limited` body stays
    /// inside the routes.
    #[allow(deprecated)]
    pub fn with_middleware(router: Router, config: &AppConfig) -> Router {
        router
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(request_logging_middleware))
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
