//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use tailspin_api::catalog::CatalogRepository;
use tailspin_api::config::{AppConfig, Environment, LoggingConfig};
use tailspin_api::observability::logging::{json_layer, level_filter};
use tailspin_api::{AppState, HttpServer};

/// In-memory log sink.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

pub struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter(self.0.clone())
    }
}

impl CapturedLogs {
    /// Every captured line, parsed as JSON.
    pub fn lines(&self) -> Vec<Value> {
        let raw = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
        raw.lines()
            .map(|line| serde_json::from_str(line).unwrap_or_else(|e| panic!("{e}: {line}")))
            .collect()
    }

    /// Lines whose message starts with `prefix`.
    pub fn with_message_prefix(&self, prefix: &str) -> Vec<Value> {
        self.lines()
            .into_iter()
            .filter(|line| {
                line["message"]
                    .as_str()
                    .is_some_and(|m| m.starts_with(prefix))
            })
            .collect()
    }
}

/// Capture JSON log lines emitted on this thread until the guard drops.
pub fn capture_logs(environment: Environment) -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let config = LoggingConfig {
        environment,
        ..LoggingConfig::default()
    };
    let subscriber = tracing_subscriber::registry()
        .with(level_filter(environment))
        .with(json_layer(&config, logs.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

pub fn test_config(debug_endpoints: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".into();
    config.logging.environment = Environment::Production;
    config.debug.endpoints_enabled = debug_endpoints;
    config
}

/// State over an empty in-memory catalog.
pub async fn memory_state(debug_endpoints: bool) -> AppState {
    state_with_config(test_config(debug_endpoints)).await
}

pub async fn state_with_config(config: AppConfig) -> AppState {
    let catalog = CatalogRepository::connect(&config.database).await.unwrap();
    catalog.init_schema().await.unwrap();
    AppState::new(config, catalog)
}

/// State over the sample catalog.
pub async fn seeded_state(debug_endpoints: bool) -> AppState {
    let state = memory_state(debug_endpoints).await;
    state.catalog.seed_sample_data().await.unwrap();
    state
}

pub fn app(state: AppState) -> Router {
    HttpServer::build_router(state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn correlation_id(&self) -> &str {
        self.headers
            .get("x-correlation-id")
            .expect("response is missing X-Correlation-ID")
            .to_str()
            .unwrap()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
