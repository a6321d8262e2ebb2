use super::metrics;
use crate::config::{bool_flag, ConfigError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::env;
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Toggles logging, metrics and the `/metrics` endpoint as a unit.
pub const OBSERVABILITY_ENABLED_VAR: &str = "OBSERVABILITY_ENABLED";

/// `json` (default) or `pretty`.
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

/// Overrides the per-service default name used in log output.
pub const SERVICE_NAME_VAR: &str = "SERVICE_NAME";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("Failed to install Prometheus metrics recorder: {0}")]
    MetricsRecorder(String),
}

/// Log line encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, for local runs.
    Pretty,
}

/// Per-service defaults, supplied by each binary.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryDefaults {
    pub service_name: &'static str,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub log_filter: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub log_format: LogFormat,
    pub service_name: String,
    pub default_log_filter: String,
}

impl TelemetryConfig {
    /// Load configuration from environment variables.
    pub fn from_env(defaults: TelemetryDefaults) -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect(), defaults)
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(
        vars: &HashMap<String, String>,
        defaults: TelemetryDefaults,
    ) -> Result<Self, ConfigError> {
        let enabled = bool_flag(vars, OBSERVABILITY_ENABLED_VAR, defaults.enabled)?;

        let log_format = match vars.get(LOG_FORMAT_VAR).map(|v| v.trim().to_ascii_lowercase()) {
            None => LogFormat::Json,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "{LOG_FORMAT_VAR} must be 'json' or 'pretty', got '{other}'"
                )))
            }
        };

        let service_name = vars
            .get(SERVICE_NAME_VAR)
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| defaults.service_name.to_string());

        Ok(Self {
            enabled,
            log_format,
            service_name,
            default_log_filter: defaults.log_filter.to_string(),
        })
    }
}

/// Process-wide telemetry context.
///
/// Owns the installed subscriber and Prometheus recorder. Created once in
/// `main`; dropped via [`Telemetry::shutdown`].
pub struct Telemetry {
    service_name: String,
    observer: Observer,
    prometheus: Option<PrometheusHandle>,
}

impl Telemetry {
    /// Install logging and metrics according to `config`.
    ///
    /// When observability is disabled nothing is installed: log events are
    /// discarded and metric calls go to the no-op recorder.
    ///
    /// # Errors
    ///
    /// Returns error if a global subscriber or recorder is already set.
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        if !config.enabled {
            return Ok(Self::disabled(config.service_name));
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_log_filter));

        let registry = tracing_subscriber::registry().with(filter);
        let installed = match config.log_format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(false),
                )
                .try_init(),
            LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        };
        installed.map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

        let prometheus = metrics::prometheus_builder()
            .map_err(TelemetryError::MetricsRecorder)?
            .install_recorder()
            .map_err(|e| TelemetryError::MetricsRecorder(e.to_string()))?;

        info!(
            target: "hello.common.telemetry",
            service = %config.service_name,
            log_format = ?config.log_format,
            "Telemetry initialized"
        );

        Ok(Self {
            service_name: config.service_name,
            observer: Observer::enabled(),
            prometheus: Some(prometheus),
        })
    }

    /// Telemetry context that records nothing.
    pub fn disabled(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            observer: Observer::disabled(),
            prometheus: None,
        }
    }

    /// Handle passed to components that record metrics.
    pub fn observer(&self) -> Observer {
        self.observer.clone()
    }

    /// Prometheus handle for serving `/metrics`; `None` when disabled.
    pub fn metrics_handle(&self) -> Option<PrometheusHandle> {
        self.prometheus.clone()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Flush buffered output before the process exits.
    pub fn shutdown(self) {
        if self.observer.is_enabled() {
            info!(
                target: "hello.common.telemetry",
                service = %self.service_name,
                "Telemetry shutting down"
            );
        }

        if let Err(e) = io::stdout().flush() {
            eprintln!("Failed to flush log output: {e}");
        }
        if let Err(e) = io::stderr().flush() {
            eprintln!("Failed to flush error output: {e}");
        }
    }
}

/// Cheap, cloneable metrics handle held by request-path components.
///
/// A disabled observer drops every measurement before it reaches the
/// `metrics` facade.
#[derive(Debug, Clone)]
pub struct Observer {
    enabled: bool,
}

impl Observer {
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_upstream_request(&self, operation: &str, status: &str, duration: Duration) {
        if self.enabled {
            metrics::record_upstream_request(operation, status, duration);
        }
    }

    pub fn record_pool_rotation(&self) {
        if self.enabled {
            metrics::record_pool_rotation();
        }
    }

    pub fn record_grpc_request(
        &self,
        service: &str,
        method: &str,
        grpc_code: i32,
        duration: Duration,
    ) {
        if self.enabled {
            metrics::record_grpc_request(service, method, grpc_code, duration);
        }
    }

    pub fn record_health_probe(&self, status: &str) {
        if self.enabled {
            metrics::record_health_probe(status);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::DebuggingRecorder;

    const DEFAULTS: TelemetryDefaults = TelemetryDefaults {
        service_name: "hello-world-proto",
        log_filter: "hello_proto_world=info",
        enabled: true,
    };

    #[test]
    fn test_config_defaults() {
        let config = TelemetryConfig::from_vars(&HashMap::new(), DEFAULTS).unwrap();
        assert!(config.enabled);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.service_name, "hello-world-proto");
        assert_eq!(config.default_log_filter, "hello_proto_world=info");
    }

    #[test]
    fn test_config_overrides() {
        let vars = HashMap::from([
            (OBSERVABILITY_ENABLED_VAR.to_string(), "false".to_string()),
            (LOG_FORMAT_VAR.to_string(), "Pretty".to_string()),
            (SERVICE_NAME_VAR.to_string(), "bridge-a".to_string()),
        ]);
        let config = TelemetryConfig::from_vars(&vars, DEFAULTS).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.service_name, "bridge-a");
    }

    #[test]
    fn test_invalid_log_format() {
        let vars = HashMap::from([(LOG_FORMAT_VAR.to_string(), "xml".to_string())]);
        let err = TelemetryConfig::from_vars(&vars, DEFAULTS).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_disabled_telemetry_installs_nothing() {
        let config = TelemetryConfig {
            enabled: false,
            log_format: LogFormat::Json,
            service_name: "hello-json-world".to_string(),
            default_log_filter: "info".to_string(),
        };
        let telemetry = Telemetry::init(config).unwrap();

        assert!(!telemetry.observer().is_enabled());
        assert!(telemetry.metrics_handle().is_none());
        assert_eq!(telemetry.service_name(), "hello-json-world");
        telemetry.shutdown();
    }

    #[test]
    fn test_disabled_observer_records_nothing() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        ::metrics::with_local_recorder(&recorder, || {
            let observer = Observer::disabled();
            observer.record_upstream_request("hello_world", "success", Duration::ZERO);
            observer.record_health_probe("healthy");
        });

        assert!(snapshotter.snapshot().into_vec().is_empty());
    }

    #[test]
    fn test_enabled_observer_records() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        ::metrics::with_local_recorder(&recorder, || {
            let observer = Observer::enabled();
            observer.record_grpc_request("HelloService", "SayHello", 0, Duration::ZERO);
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert!(snapshot
            .iter()
            .any(|(key, _, _, _)| key.key().name() == "hello_grpc_requests_total"));
    }
}
