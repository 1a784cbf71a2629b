//! Request-scoped logging context.
//!
//! The lifecycle middleware scopes a [`RequestContext`] around the rest of the
//! request future. Anything emitting an event from inside that future (the
//! handler, a named logger, the middleware itself) sees the same correlation
//! ID without passing it around.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

/// Opaque token tying together every log line of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Generate a fresh UUID v4 token.
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request state: correlation ID and the start of the timing window.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: CorrelationId,
    started_at: Instant,
}

impl RequestContext {
    /// Start a new timing window now.
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            started_at: Instant::now(),
        }
    }

    /// Milliseconds since the context was created, rounded to 2 decimals.
    pub fn elapsed_ms(&self) -> f64 {
        round_millis(self.started_at.elapsed())
    }
}

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Run `fut` with `context` as the ambient request context.
pub async fn scope<F>(context: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_CONTEXT.scope(context, fut).await
}

/// Synchronous variant of [`scope`].
pub fn sync_scope<F, R>(context: RequestContext, f: F) -> R
where
    F: FnOnce() -> R,
{
    REQUEST_CONTEXT.sync_scope(context, f)
}

/// Correlation ID of the request currently being served, if any.
pub fn current_correlation_id() -> Option<CorrelationId> {
    REQUEST_CONTEXT
        .try_with(|ctx| ctx.correlation_id.clone())
        .ok()
}

/// Elapsed time of the current request. Outside a request this is `0.0`.
pub fn elapsed_ms() -> f64 {
    REQUEST_CONTEXT
        .try_with(RequestContext::elapsed_ms)
        .unwrap_or(0.0)
}

/// Convert a duration to milliseconds with 2-decimal precision.
pub fn round_millis(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100_000.0).round() / 100.0
}
