//! Game catalog.
//!
//! # Data Flow
//! ```text
//! GET /api/games[/{id}]
//!     → handlers.rs (logging, error mapping)
//!     → repository.rs (games ⟕ publishers ⟕ categories)
//!     → models.rs (Game JSON)
//! ```

pub mod handlers;
pub mod models;
pub mod repository;

use axum::{routing::get, Router};

use crate::http::server::AppState;

pub use models::{Game, Reference};
pub use repository::CatalogRepository;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/games", get(handlers::list_games))
        .route("/api/games/{id}", get(handlers::get_game))
}
