//! Structured logging sink.
//!
//! # Responsibilities
//! - Install the process-wide tracing subscriber exactly once
//! - Pick the severity threshold from the deployment environment
//! - Route every event (including `log` crate records) through [`JsonFormat`]
//!
//! # Design Decisions
//! - Single fmt layer on stdout, no plain-text fallback layer
//! - `RUST_LOG` overrides the environment-derived threshold
//! - A second `init_logging` call returns the first outcome untouched

use std::sync::OnceLock;

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, format::DefaultFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Environment, LoggingConfig};
use crate::observability::format::JsonFormat;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

static INSTALLED: OnceLock<Result<(), LoggingError>> = OnceLock::new();

/// Threshold for an environment: DEBUG in development, INFO otherwise.
pub fn level_filter(environment: Environment) -> LevelFilter {
    match environment {
        Environment::Development => LevelFilter::DEBUG,
        Environment::Production => LevelFilter::INFO,
    }
}

/// `RUST_LOG` if set, else [`level_filter`].
pub fn env_filter(environment: Environment) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level_filter(environment).into())
        .from_env_lossy()
}

/// fmt layer writing [`JsonFormat`] lines to `writer`.
pub fn json_layer<S, W>(config: &LoggingConfig, writer: W) -> fmt::Layer<S, DefaultFields, JsonFormat, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .event_format(JsonFormat::from_config(config))
        .with_writer(writer)
}

/// Install the global JSON subscriber on stdout.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    INSTALLED
        .get_or_init(|| {
            tracing_subscriber::registry()
                .with(env_filter(config.environment))
                .with(json_layer(config, std::io::stdout))
                .try_init()
                .map_err(|err| LoggingError::Install(err.to_string()))?;

            tracing::info!(
                environment = %config.environment,
                threshold = %level_filter(config.environment),
                "Structured logging initialized"
            );
            Ok(())
        })
        .clone()
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory sink for asserting on emitted lines.

    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::Value;
    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::layer::SubscriberExt;

    use super::{json_layer, level_filter};
    use crate::config::{Environment, LoggingConfig};

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
        /// Every captured line, parsed. Panics on a non-JSON line.
        pub fn lines(&self) -> Vec<Value> {
            let raw = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
            raw.lines()
                .map(|line| serde_json::from_str(line).expect("log line is not JSON"))
                .collect()
        }

        pub fn single(&self) -> Value {
            let mut lines = self.lines();
            assert_eq!(lines.len(), 1, "expected exactly one line: {lines:?}");
            lines.remove(0)
        }
    }

    /// Install a capturing subscriber as this thread's default.
    pub fn capture(environment: Environment) -> (CapturedLogs, DefaultGuard) {
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
}
