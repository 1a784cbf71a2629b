use std::collections::HashMap;
use std::error::Error;

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::{Form, Json};
use serde::Serialize;

use crate::debug::leak::{LeakRequest, LeakStats};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Serialize)]
pub struct LeakResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: LeakStats,
}

/// `GET|POST /api/debug/leak?mb=..&count=..`
///
/// Parameters come from the query string first, then a form body. A request
/// without a form content type simply has no form parameters.
pub async fn induce_leak(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Json<LeakResponse>, ApiError> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(FormRejection::InvalidFormContentType(_)) => HashMap::new(),
        Err(rejection) => return Err(rejection.into()),
    };
    let param = |name: &str| {
        query
            .get(name)
            .filter(|v| !v.is_empty())
            .or_else(|| form.get(name))
            .map(String::as_str)
    };

    let request = match LeakRequest::parse(param("mb"), param("count")) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "Rejected leak request");
            return Err(err);
        }
    };

    let bucket = state.leak_bucket.clone();
    let stats = match tokio::task::spawn_blocking(move || bucket.leak(request)).await {
        Ok(Ok(stats)) => stats,
        Ok(Err(err)) => {
            tracing::error!(
                error = &err as &(dyn Error + 'static),
                mb = request.mb,
                count = request.count,
                "Failed to retain memory"
            );
            return Err(ApiError::Internal("Failed to allocate memory"));
        }
        Err(err) => {
            tracing::error!(error = %err, "Leak allocation task failed");
            return Err(ApiError::Internal("Failed to allocate memory"));
        }
    };

    metrics::record_leak_bytes(stats.total_bytes);
    tracing::warn!(
        mb = request.mb,
        count = request.count,
        chunks = stats.chunks,
        total_bytes = stats.total_bytes,
        "Retained memory on request"
    );

    Ok(Json(LeakResponse {
        status: "ok",
        stats,
    }))
}

/// `GET /api/debug/leak/stats`
pub async fn leak_stats(State(state): State<AppState>) -> Json<LeakStats> {
    Json(state.leak_bucket.stats())
}

/// `POST /api/debug/leak/clear`
pub async fn clear_leak(State(state): State<AppState>) -> Json<LeakResponse> {
    let stats = state.leak_bucket.clear();
    metrics::record_leak_bytes(stats.total_bytes);
    tracing::info!("Released retained memory");

    Json(LeakResponse {
        status: "cleared",
        stats,
    })
}
