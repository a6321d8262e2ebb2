//! Bridge error types.
//!
//! Errors returned to gRPC callers carry generic messages; the underlying
//! transport detail is logged server-side by the outbound client.

use common::config::ConfigError;
use common::error::TransportError;
use thiserror::Error;
use tonic::Status;

/// Bridge error type.
///
/// Maps to gRPC status codes:
/// - Upstream timeout: `DEADLINE_EXCEEDED`
/// - Any other upstream failure: `UNAVAILABLE`
/// - Startup failures: `INTERNAL` (never reach a caller in practice)
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Upstream call failed: {0}")]
    Upstream(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Server error: {0}")]
    Server(String),
}

impl BridgeError {
    /// Message safe to return to RPC callers.
    pub fn client_message(&self) -> &'static str {
        match self {
            BridgeError::Upstream(e) if e.is_timeout() => "Hello World upstream timed out",
            BridgeError::Upstream(_) => "Hello World upstream is unavailable",
            _ => "Internal error",
        }
    }
}

impl From<BridgeError> for Status {
    fn from(err: BridgeError) -> Self {
        let message = err.client_message();
        match err {
            BridgeError::Upstream(e) if e.is_timeout() => Status::deadline_exceeded(message),
            BridgeError::Upstream(_) => Status::unavailable(message),
            _ => Status::internal(message),
        }
    }
}
