//! Bridge configuration.
//!
//! Configuration is loaded from environment variables. The upstream and
//! telemetry sections are shared with the other hello-world services and
//! parsed by `common`.

use crate::observability::health::{FailureStatus, ProbeClientPolicy};
use common::config::UpstreamConfig;
use common::observability::TelemetryDefaults;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

pub use common::config::ConfigError;

/// Default gRPC bind address.
pub const DEFAULT_GRPC_BIND_ADDRESS: &str = "0.0.0.0:50051";

/// Default health/metrics HTTP bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default upper bound on waiting for in-flight calls at shutdown.
pub const DEFAULT_SHUTDOWN_DRAIN_SECONDS: u64 = 10;

/// Telemetry defaults for the bridge binary.
pub const TELEMETRY_DEFAULTS: TelemetryDefaults = TelemetryDefaults {
    service_name: "hello-world-proto",
    log_filter: "hello=info,common=info,tower_http=warn,h2=warn",
    enabled: true,
};

/// Bridge configuration.
#[derive(Clone)]
pub struct Config {
    /// Upstream Hello World endpoint and connection lifetime.
    pub upstream: UpstreamConfig,

    /// gRPC server bind address (default: "0.0.0.0:50051").
    pub grpc_bind_address: String,

    /// Health and metrics HTTP bind address (default: "0.0.0.0:8081").
    pub health_bind_address: String,

    /// Status reported when a health probe fails with a transport error.
    pub health_failure_status: FailureStatus,

    /// Whether probes build their own client or share the request-path one.
    pub health_probe_client: ProbeClientPolicy,

    /// How long shutdown waits for in-flight calls before giving up.
    pub shutdown_drain: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("upstream", &self.upstream)
            .field("grpc_bind_address", &self.grpc_bind_address)
            .field("health_bind_address", &self.health_bind_address)
            .field("health_failure_status", &self.health_failure_status)
            .field("health_probe_client", &self.health_probe_client)
            .field("shutdown_drain_seconds", &self.shutdown_drain.as_secs())
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let upstream = UpstreamConfig::from_vars(vars)?;

        let grpc_bind_address = vars
            .get("GRPC_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GRPC_BIND_ADDRESS.to_string());

        let health_bind_address = vars
            .get("HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let health_failure_status = match vars.get("HEALTH_FAILURE_STATUS") {
            Some(value) => FailureStatus::parse(value).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "HEALTH_FAILURE_STATUS must be 'unhealthy' or 'degraded', got '{value}'"
                ))
            })?,
            None => FailureStatus::default(),
        };

        let health_probe_client = match vars.get("HEALTH_PROBE_CLIENT") {
            Some(value) => ProbeClientPolicy::parse(value).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "HEALTH_PROBE_CLIENT must be 'fresh' or 'shared', got '{value}'"
                ))
            })?,
            None => ProbeClientPolicy::default(),
        };

        let shutdown_drain = match vars.get("SHUTDOWN_DRAIN_SECONDS") {
            Some(value) => Duration::from_secs(value.trim().parse().map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "SHUTDOWN_DRAIN_SECONDS must be a valid integer, got '{value}': {e}"
                ))
            })?),
            None => Duration::from_secs(DEFAULT_SHUTDOWN_DRAIN_SECONDS),
        };

        Ok(Self {
            upstream,
            grpc_bind_address,
            health_bind_address,
            health_failure_status,
            health_probe_client,
            shutdown_drain,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "HELLO_WORLD_BASE_URL".to_string(),
            "http://hello-world:8080".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).unwrap();

        assert_eq!(config.grpc_bind_address, DEFAULT_GRPC_BIND_ADDRESS);
        assert_eq!(config.health_bind_address, DEFAULT_HEALTH_BIND_ADDRESS);
        assert_eq!(config.health_failure_status, FailureStatus::Unhealthy);
        assert_eq!(config.health_probe_client, ProbeClientPolicy::Fresh);
        assert_eq!(config.shutdown_drain, Duration::from_secs(10));
        assert_eq!(
            config.upstream.pooled_connection_lifetime,
            Duration::from_secs(900)
        );
    }

    #[test]
    fn test_from_vars_overrides() {
        let mut vars = base_vars();
        vars.insert("GRPC_BIND_ADDRESS".to_string(), "127.0.0.1:6000".to_string());
        vars.insert("HEALTH_BIND_ADDRESS".to_string(), "127.0.0.1:6001".to_string());
        vars.insert("HEALTH_FAILURE_STATUS".to_string(), "Degraded".to_string());
        vars.insert("HEALTH_PROBE_CLIENT".to_string(), "shared".to_string());
        vars.insert("SHUTDOWN_DRAIN_SECONDS".to_string(), "2".to_string());

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.grpc_bind_address, "127.0.0.1:6000");
        assert_eq!(config.health_bind_address, "127.0.0.1:6001");
        assert_eq!(config.health_failure_status, FailureStatus::Degraded);
        assert_eq!(config.health_probe_client, ProbeClientPolicy::Shared);
        assert_eq!(config.shutdown_drain, Duration::from_secs(2));
    }

    #[test]
    fn test_missing_upstream_is_fatal() {
        let err = Config::from_vars(&HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_invalid_failure_status() {
        let mut vars = base_vars();
        vars.insert("HEALTH_FAILURE_STATUS".to_string(), "healthy".to_string());

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("HEALTH_FAILURE_STATUS"));
    }

    #[test]
    fn test_invalid_probe_client() {
        let mut vars = base_vars();
        vars.insert("HEALTH_PROBE_CLIENT".to_string(), "pooled".to_string());

        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_invalid_drain() {
        let mut vars = base_vars();
        vars.insert("SHUTDOWN_DRAIN_SECONDS".to_string(), "-1".to_string());

        assert!(Config::from_vars(&vars).is_err());
    }
}
