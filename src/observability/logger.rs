//! Named loggers for route handlers.
//!
//! A [`Logger`] emits ordinary tracing events, so everything installed by
//! [`init_logging`](crate::observability::logging::init_logging) applies:
//! threshold, JSON formatting, and the ambient correlation ID. Domain fields
//! travel in a [`Fields`] map.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::observability::format::{render_error_chain, Severity};

/// Caller-supplied fields of a log event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Map<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a serializable value. Values that fail to serialize are stored as
    /// the serialization error text instead.
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|err| Value::String(format!("<unserializable: {err}>")));
        self.0.insert(key.into(), value);
        self
    }

    /// Add a value by its `Display` rendering.
    pub fn with_display(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.0.insert(key.into(), Value::String(value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Handle scoped by a logical component name.
#[derive(Debug, Clone)]
pub struct Logger {
    name: Arc<str>,
}

/// Get a logger for `name` (typically `module_path!()`).
pub fn get_logger(name: impl Into<Arc<str>>) -> Logger {
    Logger { name: name.into() }
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self, message: impl AsRef<str>, fields: Fields) {
        self.emit(Severity::Debug, message.as_ref(), &fields, None);
    }

    pub fn info(&self, message: impl AsRef<str>, fields: Fields) {
        self.emit(Severity::Info, message.as_ref(), &fields, None);
    }

    pub fn warning(&self, message: impl AsRef<str>, fields: Fields) {
        self.emit(Severity::Warning, message.as_ref(), &fields, None);
    }

    /// Log at ERROR. When `cause` is given, its source chain and a backtrace
    /// (if enabled through `RUST_BACKTRACE`) go into the `exception` field.
    pub fn error(
        &self,
        message: impl AsRef<str>,
        fields: Fields,
        cause: Option<&(dyn Error + 'static)>,
    ) {
        let exception = cause.map(|err| {
            let mut text = render_error_chain(err);
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                text.push_str("\nStack backtrace:\n");
                text.push_str(&backtrace.to_string());
            }
            text
        });
        self.emit(Severity::Error, message.as_ref(), &fields, exception.as_deref());
    }

    pub fn critical(&self, message: impl AsRef<str>, fields: Fields) {
        self.emit(Severity::Critical, message.as_ref(), &fields, None);
    }

    fn emit(&self, severity: Severity, message: &str, fields: &Fields, exception: Option<&str>) {
        let extra = fields.to_json();
        let name: &str = &self.name;

        match severity {
            Severity::Debug => tracing::debug!(
                log.logger = name,
                log.extra = extra.as_str(),
                "{}",
                message
            ),
            Severity::Info => tracing::info!(
                log.logger = name,
                log.extra = extra.as_str(),
                "{}",
                message
            ),
            Severity::Warning => tracing::warn!(
                log.logger = name,
                log.extra = extra.as_str(),
                "{}",
                message
            ),
            Severity::Error => tracing::error!(
                log.logger = name,
                log.extra = extra.as_str(),
                exception = exception,
                "{}",
                message
            ),
            Severity::Critical => tracing::error!(
                log.logger = name,
                log.severity = Severity::Critical.as_str(),
                log.extra = extra.as_str(),
                "{}",
                message
            ),
        }
    }
}
