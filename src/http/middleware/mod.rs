//! HTTP middleware.

pub mod request_logging;

pub use request_logging::request_logging_middleware;
