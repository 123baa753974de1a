//! Observability and telemetry.

mod logging;
mod metrics;

pub use logging::{ENV_LOG_FILE, ENV_LOG_FORMAT, ENV_LOG_LEVEL, LogFormat, LoggingConfig};
pub use metrics::{ENV_METRICS_ENABLED, ENV_METRICS_PORT, MetricsConfig, install_prometheus};

use crate::config::GitRepoConfig;
use crate::{Error, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Full observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl ObservabilityConfig {
    /// Builds observability configuration from loaded settings and env.
    #[must_use]
    pub fn from_config(config: &GitRepoConfig, verbose: bool) -> Self {
        Self {
            logging: LoggingConfig::from_settings(Some(&config.logging), verbose),
            metrics: MetricsConfig::from_settings(Some(&config.metrics)),
        }
    }
}

/// Handle for observability runtime components.
#[derive(Debug, Default)]
pub struct ObservabilityHandle {
    metrics: Option<PrometheusHandle>,
}

impl ObservabilityHandle {
    /// Renders the current metrics in Prometheus text format, if enabled.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics.as_ref().map(PrometheusHandle::render)
    }
}

/// Initializes logging and metrics for the process.
///
/// # Errors
///
/// Returns an error if a global subscriber or recorder is already installed,
/// the log file cannot be opened, or the metrics exporter fails to start.
pub fn init(config: ObservabilityConfig) -> Result<ObservabilityHandle> {
    let metrics = install_prometheus(&config.metrics)?;

    let filter = EnvFilter::try_new(&config.logging.filter).map_err(|e| Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: format!("invalid log filter '{}': {e}", config.logging.filter),
    })?;

    let (writer, ansi) = match &config.logging.file {
        Some(path) => (BoxMakeWriter::new(open_log_file(path)?), false),
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .with(filter)
            .try_init()
            .map_err(init_error)?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true),
            )
            .with(filter)
            .try_init()
            .map_err(init_error)?,
    }

    Ok(ObservabilityHandle { metrics })
}

/// Thread-safe file writer for logging.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Opens a log file for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_log_dir".to_string(),
            cause: e.to_string(),
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::OperationFailed {
            operation: "open_log_file".to_string(),
            cause: format!("{}: {}", path.display(), e),
        })?;

    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}

/// Helper to convert init errors.
#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: e.to_string(),
    }
}
