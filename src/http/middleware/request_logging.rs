//! Request lifecycle logging.
//!
//! Per request: `START → IN_HANDLER → COMPLETE`.
//!
//! - START resolves the correlation ID, opens the timing window and emits
//!   `Incoming request: METHOD PATH`.
//! - IN_HANDLER runs the rest of the stack inside the request context, so
//!   handler events carry the same correlation ID.
//! - COMPLETE emits `Request completed: METHOD PATH - STATUS` with the
//!   duration and writes `X-Correlation-ID` on the response.
//!
//! Panics are turned into responses further in (`CatchPanicLayer`), so
//! COMPLETE is reached for every request that produces a response.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::http::request::{resolve_correlation_id, X_CORRELATION_ID};
use crate::observability::context::{self, RequestContext};
use crate::observability::metrics;

pub async fn request_logging_middleware(mut request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let correlation_id = resolve_correlation_id(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();

    request.extensions_mut().insert(correlation_id.clone());
    let ctx = RequestContext::new(correlation_id.clone());

    context::scope(ctx, async move {
        tracing::info!(
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            user_agent = %user_agent,
            "Incoming request: {} {}",
            method,
            path
        );

        let mut response = next.run(request).await;
        let status = response.status();
        let duration_ms = context::elapsed_ms();

        tracing::info!(
            method = %method,
            path = %path,
            status_code = status.as_u16(),
            duration_ms = duration_ms,
            "Request completed: {} {} - {}",
            method,
            path,
            status.as_u16()
        );

        // Inbound values were already valid header bytes; generated ones are UUIDs.
        if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
            response.headers_mut().insert(X_CORRELATION_ID.clone(), value);
        }
        metrics::record_request(method.as_str(), status.as_u16(), started.elapsed());

        response
    })
    .await
}
