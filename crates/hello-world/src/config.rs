//! Responder configuration.

use common::observability::TelemetryDefaults;
use std::collections::HashMap;
use std::env;

pub use common::config::ConfigError;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Telemetry defaults for the responder binary.
pub const TELEMETRY_DEFAULTS: TelemetryDefaults = TelemetryDefaults {
    service_name: "hello-world",
    log_filter: "hello=info,common=info,tower_http=warn",
    enabled: true,
};

/// Responder configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        if bind_address.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "BIND_ADDRESS must not be empty".to_string(),
            ));
        }

        Ok(Self { bind_address })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_address() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_bind_address_override() {
        let vars = HashMap::from([("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string())]);
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_empty_bind_address_rejected() {
        let vars = HashMap::from([("BIND_ADDRESS".to_string(), " ".to_string())]);
        assert!(Config::from_vars(&vars).is_err());
    }
}
