//! Structured JSON record formatter.
//!
//! Every event becomes one JSON object on one line:
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.123456Z","level":"INFO","message":"...",
//!  "service":"tailspin-toystore-api","environment":"production",
//!  "correlation_id":"...", <caller fields>, "exception":"..."}
//! ```
//!
//! Reserved keys are always produced by the formatter itself. A caller field
//! with a reserved name is dropped rather than allowed to replace the value.

use std::error::Error;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::config::{Environment, LoggingConfig};
use crate::observability::context;

/// Keys owned by the formatter.
pub const RESERVED_KEYS: [&str; 7] = [
    "timestamp",
    "level",
    "message",
    "service",
    "environment",
    "correlation_id",
    "exception",
];

/// Prefix of bookkeeping fields that never reach the output. The `log` crate
/// bridge uses it too (`log.target`, `log.file`, ...).
const INTERNAL_PREFIX: &str = "log.";

/// Overrides the severity derived from the tracing level.
pub(crate) const SEVERITY_FIELD: &str = "log.severity";
/// JSON object of caller fields, merged into the record.
pub(crate) const EXTRA_FIELD: &str = "log.extra";

/// Ordered severity scale of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DEBUG" => Some(Severity::Debug),
            "INFO" => Some(Severity::Info),
            "WARNING" => Some(Severity::Warning),
            "ERROR" => Some(Severity::Error),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl From<&Level> for Severity {
    fn from(level: &Level) -> Self {
        match *level {
            Level::TRACE | Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warning,
            Level::ERROR => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log event: fixed fields plus an extension map.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub message: String,
    pub service: Arc<str>,
    pub environment: Environment,
    pub correlation_id: Option<String>,
    pub exception: Option<String>,
    extra: Map<String, Value>,
}

impl LogRecord {
    pub fn new(
        level: Severity,
        message: impl Into<String>,
        service: Arc<str>,
        environment: Environment,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            service,
            environment,
            correlation_id: None,
            exception: None,
            extra: Map::new(),
        }
    }

    /// Add a caller field. Returns `false` (and drops the value) when the
    /// key is reserved or internal.
    pub fn insert_extra(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if is_reserved(&key) || is_internal(&key) {
            return false;
        }
        self.extra.insert(key, value);
        true
    }

    pub fn to_value(&self) -> Value {
        let mut obj = self.extra.clone();
        obj.insert(
            "timestamp".into(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        obj.insert("level".into(), Value::String(self.level.as_str().into()));
        obj.insert("message".into(), Value::String(self.message.clone()));
        obj.insert("service".into(), Value::String(self.service.to_string()));
        obj.insert(
            "environment".into(),
            Value::String(self.environment.as_str().into()),
        );
        if let Some(ref id) = self.correlation_id {
            obj.insert("correlation_id".into(), Value::String(id.clone()));
        }
        if let Some(ref exception) = self.exception {
            obj.insert("exception".into(), Value::String(exception.clone()));
        }
        Value::Object(obj)
    }

    /// Render as a single JSON line (without the trailing newline).
    pub fn render(&self) -> String {
        serde_json::to_string(&self.to_value()).unwrap_or_else(|err| {
            format!(
                "{} {} {} (unstructured fallback: {})",
                self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                self.level,
                self.message,
                err
            )
        })
    }
}

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

fn is_internal(key: &str) -> bool {
    key.starts_with(INTERNAL_PREFIX) || key.starts_with('_')
}

/// Render an error and its `source()` chain.
pub fn render_error_chain(err: &(dyn Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(text, "\nCaused by: {cause}");
        source = cause.source();
    }
    text
}

/// `FormatEvent` producing [`LogRecord`] lines.
#[derive(Debug, Clone)]
pub struct JsonFormat {
    service: Arc<str>,
    environment: Environment,
}

impl JsonFormat {
    pub fn new(service: impl Into<Arc<str>>, environment: Environment) -> Self {
        Self {
            service: service.into(),
            environment,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new(config.service_name.as_str(), config.environment)
    }

    /// Collect an event's fields into a record.
    pub fn record_from_event(&self, event: &Event<'_>) -> LogRecord {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let level = visitor
            .severity
            .unwrap_or_else(|| Severity::from(event.metadata().level()));
        let mut record = LogRecord::new(
            level,
            visitor.message.unwrap_or_default(),
            self.service.clone(),
            self.environment,
        );
        record.correlation_id = visitor
            .correlation_id
            .or_else(|| context::current_correlation_id().map(|id| id.to_string()));
        record.exception = visitor.exception;

        if let Some(extra) = visitor.extra {
            for (key, value) in extra {
                record.insert_extra(key, value);
            }
        }
        for (key, value) in visitor.fields {
            record.insert_extra(key, value);
        }
        record
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let record = self.record_from_event(event);
        writeln!(writer, "{}", record.render())
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    correlation_id: Option<String>,
    exception: Option<String>,
    severity: Option<Severity>,
    extra: Option<Map<String, Value>>,
    fields: Vec<(String, Value)>,
}

impl FieldVisitor {
    fn put(&mut self, name: &str, value: Value) {
        match name {
            "message" => self.message = Some(value_to_string(value)),
            "correlation_id" => {
                let id = value_to_string(value);
                if !id.is_empty() {
                    self.correlation_id = Some(id);
                }
            }
            "exception" => self.exception = Some(value_to_string(value)),
            SEVERITY_FIELD => self.severity = Severity::parse(&value_to_string(value)),
            EXTRA_FIELD => {
                if let Ok(Value::Object(map)) =
                    serde_json::from_str::<Value>(&value_to_string(value))
                {
                    self.extra = Some(map);
                }
            }
            _ if is_internal(name) => {}
            _ => self.fields.push((name.to_string(), value)),
        }
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field.name(), float_value(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field.name(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field.name(), Value::from(value));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        let value = i64::try_from(value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        self.put(field.name(), value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        let value = u64::try_from(value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        self.put(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field.name(), Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field.name(), Value::String(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if is_internal(field.name()) {
            return;
        }
        self.exception = Some(render_error_chain(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field.name(), Value::String(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::context::{sync_scope, CorrelationId, RequestContext};
    use crate::observability::logging::test_support::capture;

    fn record(level: Severity, message: &str) -> LogRecord {
        LogRecord::new(level, message, Arc::from("svc"), Environment::Production)
    }

    #[test]
    fn test_basic_record_shape() {
        let value = record(Severity::Info, "Test message").to_value();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["message"], "Test message");
        assert_eq!(value["service"], "svc");
        assert_eq!(value["environment"], "production");
        assert!(value.get("correlation_id").is_none());
        assert!(value.get("exception").is_none());

        let ts = value["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z'), "timestamp {ts} must use Z suffix");
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_reserved_keys_win() {
        let mut rec = record(Severity::Warning, "real message");
        assert!(!rec.insert_extra("level", Value::from("DEBUG")));
        assert!(!rec.insert_extra("message", Value::from("spoofed")));
        assert!(!rec.insert_extra("log.target", Value::from("internal")));
        assert!(!rec.insert_extra("_private", Value::from(1)));
        assert!(rec.insert_extra("user_id", Value::from(123)));

        let value = rec.to_value();
        assert_eq!(value["level"], "WARNING");
        assert_eq!(value["message"], "real message");
        assert_eq!(value["user_id"], 123);
        assert!(value.get("log.target").is_none());
        assert!(value.get("_private").is_none());
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::from(&Level::WARN), Severity::Warning);
        assert_eq!(Severity::from(&Level::TRACE), Severity::Debug);
    }

    #[test]
    fn test_error_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer failure")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        assert_eq!(render_error_chain(&err), "outer failure\nCaused by: disk gone");
    }

    #[test]
    fn test_event_fields_are_merged() {
        let (logs, _guard) = capture(Environment::Development);

        tracing::info!(
            game_count = 3,
            ratio = 0.5,
            ok = true,
            title = "Space Race",
            level = "spoofed",
            "Retrieved {} games",
            3
        );

        let line = logs.single();
        assert_eq!(line["message"], "Retrieved 3 games");
        assert_eq!(line["level"], "INFO");
        assert_eq!(line["environment"], "development");
        assert_eq!(line["game_count"], 3);
        assert_eq!(line["ratio"], 0.5);
        assert_eq!(line["ok"], true);
        assert_eq!(line["title"], "Space Race");
    }

    #[test]
    fn test_non_json_values_are_coerced() {
        let (logs, _guard) = capture(Environment::Production);

        #[derive(Debug)]
        struct Opaque {
            _id: u8,
        }
        let thing = Opaque { _id: 7 };
        tracing::warn!(thing = ?thing, nan = f64::NAN, "coerced");

        let line = logs.single();
        assert_eq!(line["level"], "WARNING");
        assert_eq!(line["thing"], "Opaque { _id: 7 }");
        assert_eq!(line["nan"], "NaN");
    }

    #[test]
    fn test_ambient_correlation_id() {
        let (logs, _guard) = capture(Environment::Production);

        let ctx = RequestContext::new(CorrelationId::from("test-correlation-123"));
        sync_scope(ctx, || tracing::info!("inside request"));
        tracing::info!("outside request");

        let lines = logs.lines();
        assert_eq!(lines[0]["correlation_id"], "test-correlation-123");
        assert!(lines[1].get("correlation_id").is_none());
    }

    #[test]
    fn test_explicit_correlation_id_field() {
        let (logs, _guard) = capture(Environment::Production);
        tracing::info!(correlation_id = "explicit-1", "tagged");
        assert_eq!(logs.single()["correlation_id"], "explicit-1");
    }

    #[test]
    fn test_error_field_becomes_exception() {
        let (logs, _guard) = capture(Environment::Production);
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        tracing::error!(error = &err as &(dyn Error + 'static), "failed");

        let line = logs.single();
        assert_eq!(line["level"], "ERROR");
        assert_eq!(line["exception"], "boom");
        assert!(line.get("error").is_none());
    }

    #[test]
    fn test_debug_events_dropped_in_production() {
        let (logs, _guard) = capture(Environment::Production);
        tracing::debug!("noise");
        tracing::info!("signal");
        let lines = logs.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], "signal");
    }
}
