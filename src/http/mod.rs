//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → middleware/request_logging.rs (correlation ID, lifecycle events)
//!     → catalog / debug handlers
//!     → response.rs (error bodies)
//!     → Send to client (with X-Correlation-ID)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{resolve_correlation_id, X_CORRELATION_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
