//! JSON responder configuration.

use common::config::UpstreamConfig;
use common::observability::TelemetryDefaults;
use std::collections::HashMap;
use std::env;

pub use common::config::ConfigError;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8082";

/// Observability is off unless `OBSERVABILITY_ENABLED` turns it on.
pub const TELEMETRY_DEFAULTS: TelemetryDefaults = TelemetryDefaults {
    service_name: "hello-json-world",
    log_filter: "hello=info,common=info,tower_http=warn",
    enabled: false,
};

/// JSON responder configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream Hello World endpoint and connection lifetime.
    pub upstream: UpstreamConfig,

    /// Server bind address (default: "0.0.0.0:8082").
    pub bind_address: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let upstream = UpstreamConfig::from_vars(vars)?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        Ok(Self {
            upstream,
            bind_address,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_defaults() {
        let vars = HashMap::from([(
            "HELLO_WORLD_BASE_URL".to_string(),
            "http://hello-world:8080".to_string(),
        )]);

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.upstream.base_url.as_str(), "http://hello-world:8080/");
    }

    #[test]
    fn test_missing_upstream_is_fatal() {
        let err = Config::from_vars(&HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_observability_off_by_default() {
        assert!(!TELEMETRY_DEFAULTS.enabled);
    }
}
