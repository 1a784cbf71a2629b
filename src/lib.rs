//! Tailspin Toys catalog API.
//!
//! A read-only game catalog over SQLite, a structured JSON logging pipeline
//! with per-request correlation IDs, and opt-in debug endpoints that retain
//! memory on purpose.

// Core subsystems
pub mod catalog;
pub mod config;
pub mod http;

// Auxiliary endpoints
pub mod debug;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
