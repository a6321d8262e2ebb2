//! Upstream endpoint configuration.
//!
//! Every service that talks to the Hello World upstream reads the same
//! `HELLO_WORLD_*` variables. The helpers at the bottom of this module are
//! shared by each service's own `Config` so that parsing rules and error
//! messages stay uniform.

use reqwest::Url;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Required base address of the upstream Hello World service.
pub const BASE_URL_VAR: &str = "HELLO_WORLD_BASE_URL";

/// Age after which a pooled upstream connection is retired.
pub const POOLED_CONNECTION_LIFETIME_VAR: &str = "HELLO_WORLD_POOLED_CONNECTION_LIFETIME_SECONDS";

/// Whole-request timeout for upstream calls.
pub const REQUEST_TIMEOUT_VAR: &str = "HELLO_WORLD_REQUEST_TIMEOUT_SECONDS";

/// Connection establishment timeout for upstream calls.
pub const CONNECT_TIMEOUT_VAR: &str = "HELLO_WORLD_CONNECT_TIMEOUT_SECONDS";

/// Default pooled connection lifetime (15 minutes).
pub const DEFAULT_POOLED_CONNECTION_LIFETIME_SECONDS: u64 = 900;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 100;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid upstream base URL: {0}")]
    InvalidUpstreamUrl(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Where the upstream lives and how long its connections may live.
///
/// Immutable once loaded; one instance per service process.
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Absolute `http`/`https` base address of the upstream.
    pub base_url: Url,

    /// Age after which pooled connections are retired, even if healthy.
    pub pooled_connection_lifetime: Duration,

    /// Upper bound for a single upstream call, body included.
    pub request_timeout: Duration,

    /// Upper bound for establishing a new connection.
    pub connect_timeout: Duration,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "pooled_connection_lifetime_seconds",
                &self.pooled_connection_lifetime.as_secs(),
            )
            .field("request_timeout_seconds", &self.request_timeout.as_secs())
            .field("connect_timeout_seconds", &self.connect_timeout.as_secs())
            .finish()
    }
}

impl UpstreamConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw_base_url = vars
            .get(BASE_URL_VAR)
            .ok_or_else(|| ConfigError::MissingEnvVar(BASE_URL_VAR.to_string()))?;

        let base_url = parse_base_url(raw_base_url)?;

        let pooled_connection_lifetime = positive_seconds(
            vars,
            POOLED_CONNECTION_LIFETIME_VAR,
            DEFAULT_POOLED_CONNECTION_LIFETIME_SECONDS,
        )?;
        let request_timeout =
            positive_seconds(vars, REQUEST_TIMEOUT_VAR, DEFAULT_REQUEST_TIMEOUT_SECONDS)?;
        let connect_timeout =
            positive_seconds(vars, CONNECT_TIMEOUT_VAR, DEFAULT_CONNECT_TIMEOUT_SECONDS)?;

        Ok(Self {
            base_url,
            pooled_connection_lifetime,
            request_timeout,
            connect_timeout,
        })
    }

    /// Configuration with default timeouts for the given base address.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            pooled_connection_lifetime: Duration::from_secs(
                DEFAULT_POOLED_CONNECTION_LIFETIME_SECONDS,
            ),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECONDS),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        ConfigError::InvalidUpstreamUrl(format!("{BASE_URL_VAR} '{raw}' is not a valid URL: {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUpstreamUrl(format!(
            "{BASE_URL_VAR} must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUpstreamUrl(format!(
            "{BASE_URL_VAR} must include a host, got '{raw}'"
        )));
    }

    Ok(url)
}

/// Parse a strictly positive number of seconds, falling back to `default`.
pub fn positive_seconds(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(Duration::from_secs(default));
    };

    let value: u64 = value_str.trim().parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{key} must be a valid integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{key} must be greater than 0"
        )));
    }

    Ok(Duration::from_secs(value))
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`), falling back to `default`.
pub fn bool_flag(
    vars: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) if v == "false" || v == "0" => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue(format!(
            "{key} must be true, false, 1 or 0, got '{other}'"
        ))),
    }
}
