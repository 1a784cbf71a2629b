//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Middleware / handlers / named loggers
//!     → tracing events
//!     → logging.rs (threshold + single fmt layer)
//!     → format.rs (one JSON object per line, stdout)
//!
//! context.rs supplies the correlation ID of the request being served.
//! metrics.rs (counters, histograms) → optional Prometheus listener
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Correlation ID flows through a task-local, not through arguments
//! - Reserved record keys cannot be overwritten by caller fields

pub mod context;
pub mod format;
pub mod logger;
pub mod logging;
pub mod metrics;

pub use context::{CorrelationId, RequestContext};
pub use format::{JsonFormat, LogRecord, Severity};
pub use logger::{get_logger, Fields, Logger};
pub use logging::{init_logging, LoggingError};
