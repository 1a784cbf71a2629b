//! Request-side correlation handling.
//!
//! # Responsibilities
//! - Resolve the correlation ID from `X-Correlation-ID` or generate one
//! - Expose the resolved ID to handlers as an extractor
//!
//! # Design Decisions
//! - Only the first header value is considered
//! - An unusable header never fails the request; a new ID is generated

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};

use crate::observability::context::{self, CorrelationId};

/// Correlation header, read on the way in and written on the way out.
pub static X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Longest inbound correlation ID adopted as-is.
pub const MAX_CORRELATION_ID_LEN: usize = 256;

/// Adopt the inbound correlation ID when usable, otherwise generate one.
pub fn resolve_correlation_id(headers: &HeaderMap) -> CorrelationId {
    headers
        .get_all(&X_CORRELATION_ID)
        .iter()
        .next()
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty() && value.len() <= MAX_CORRELATION_ID_LEN)
        .map(CorrelationId::from)
        .unwrap_or_else(CorrelationId::generate)
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<CorrelationId>() {
            return Ok(id.clone());
        }
        Ok(context::current_correlation_id()
            .unwrap_or_else(|| resolve_correlation_id(&parts.headers)))
    }
}
