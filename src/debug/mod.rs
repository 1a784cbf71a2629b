//! Debug endpoints.
//!
//! # Responsibilities
//! - Retain memory on demand so leak detection and alerting can be exercised
//! - Report and release what is retained
//!
//! # Design Decisions
//! - Only mounted when `debug.endpoints_enabled` (off by default)
//! - The bucket lives in `AppState`, not in a global

pub mod handlers;
pub mod leak;

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;

pub use leak::{LeakBucket, LeakRequest, LeakStats};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/debug/leak",
            get(handlers::induce_leak).post(handlers::induce_leak),
        )
        .route("/api/debug/leak/stats", get(handlers::leak_stats))
        .route("/api/debug/leak/clear", post(handlers::clear_leak))
}
