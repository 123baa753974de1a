//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Environment variable enabling the exporter.
pub const ENV_METRICS_ENABLED: &str = "GITREPO_METRICS_ENABLED";

/// Environment variable setting the exporter port.
pub const ENV_METRICS_PORT: &str = "GITREPO_METRICS_PORT";

const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address to bind the metrics exporter.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: listen_addr(DEFAULT_METRICS_PORT),
        }
    }
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&MetricsSettings>) -> Self {
        Self::from_settings_with(settings, |key| std::env::var(key).ok())
    }

    /// Like [`Self::from_settings`] with an explicit variable lookup.
    #[must_use]
    pub fn from_settings_with(
        settings: Option<&MetricsSettings>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut enabled = settings.and_then(|config| config.enabled).unwrap_or(false);
        let mut port = settings
            .and_then(|config| config.port)
            .unwrap_or(DEFAULT_METRICS_PORT);

        if let Some(value) = lookup(ENV_METRICS_ENABLED) {
            enabled = parse_bool(&value);
        }
        if let Some(value) = lookup(ENV_METRICS_PORT).and_then(|v| v.trim().parse().ok()) {
            port = value;
        }

        Self {
            enabled,
            listen_addr: listen_addr(port),
        }
    }
}

fn listen_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// Must be called from inside a tokio runtime; the exporter task is spawned
/// on it. Returns `None` when metrics are disabled, in which case every
/// `metrics::` macro call is a no-op.
///
/// # Errors
///
/// Returns an error if there is no runtime, the exporter cannot be built,
/// or a global recorder is already installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let runtime = tokio::runtime::Handle::try_current().map_err(|e| Error::OperationFailed {
        operation: "metrics_exporter_build".to_string(),
        cause: e.to_string(),
    })?;

    let (recorder, exporter) = {
        let _guard = runtime.enter();
        PrometheusBuilder::new()
            .with_http_listener(config.listen_addr)
            .build()
            .map_err(|e| Error::OperationFailed {
                operation: "metrics_exporter_build".to_string(),
                cause: e.to_string(),
            })?
    };

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })?;
    runtime.spawn(exporter);

    tracing::info!(addr = %config.listen_addr, "Prometheus exporter listening");
    Ok(Some(handle))
}
