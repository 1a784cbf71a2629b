//! Error responses.
//!
//! # Design Decisions
//! - Client errors carry a machine-readable `error` field
//! - Internal errors return a generic message; detail goes to the log only

use std::any::Any;

use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors a handler can return to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 404 with `{"error": <message>}`.
    #[error("{0}")]
    NotFound(&'static str),

    /// 400 with `{"error": "invalid_parameters", "message": <detail>}`.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Unreadable request body, with the extractor's status (413 when over
    /// the body limit) and `{"error": "invalid_body", "message": <detail>}`.
    #[error("invalid body: {0}")]
    InvalidBody(#[from] FormRejection),

    /// 500 with `{"error": <message>}`. The message must be safe to show.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody(rejection) => rejection.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::NotFound(message) | ApiError::Internal(message) => {
                json!({ "error": message })
            }
            ApiError::InvalidParameters(detail) => {
                json!({ "error": "invalid_parameters", "message": detail })
            }
            ApiError::InvalidBody(rejection) => {
                json!({ "error": "invalid_body", "message": rejection.body_text() })
            }
        };
        (self.status(), Json(body)).into_response()
    }
}

/// `CatchPanicLayer` handler: log the panic and answer 500.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(
        error_type = "panic",
        exception = %detail,
        "Unhandled error in request handler"
    );
    ApiError::Internal("Internal server error").into_response()
}
