//! Error types for calls to the upstream Hello World service.

use std::error::Error as StdError;
use thiserror::Error;

/// Failure of an outbound call that never produced a response body.
///
/// A response with any status code is a success at this layer; only
/// failures to reach the upstream or to read what it sent end up here.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    /// No connection could be established (DNS failure, refused, reset).
    #[error("Failed to connect to upstream: {0}")]
    Connect(String),

    /// The request failed after a connection was available.
    #[error("Upstream request failed: {0}")]
    Request(String),

    /// The response body could not be read.
    #[error("Failed to read upstream response body: {0}")]
    Body(String),

    /// The HTTP client itself could not be constructed.
    #[error("Failed to build upstream HTTP client: {0}")]
    ClientBuild(String),
}

impl TransportError {
    /// Returns true if the call was abandoned because it ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }

    /// Short, bounded label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Connect(_) => "connect",
            TransportError::Request(_) => "request",
            TransportError::Body(_) => "body",
            TransportError::ClientBuild(_) => "client_build",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let detail = error_chain(&e);
        if e.is_timeout() {
            TransportError::Timeout(detail)
        } else if e.is_connect() {
            TransportError::Connect(detail)
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(detail)
        } else if e.is_builder() {
            TransportError::ClientBuild(detail)
        } else {
            TransportError::Request(detail)
        }
    }
}

/// Flattens an error and its sources into one line.
///
/// reqwest's top-level message is generic ("error sending request"); the
/// useful part (e.g. "Connection refused") lives in the source chain.
fn error_chain(e: &dyn StdError) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Leaf;

    impl fmt::Display for Leaf {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Connection refused")
        }
    }

    impl StdError for Leaf {}

    #[derive(Debug)]
    struct Outer(Leaf);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_error_chain_includes_sources() {
        assert_eq!(
            error_chain(&Outer(Leaf)),
            "error sending request: Connection refused"
        );
    }

    #[test]
    fn test_kind_labels_are_bounded() {
        assert_eq!(TransportError::Timeout(String::new()).kind(), "timeout");
        assert_eq!(TransportError::Connect(String::new()).kind(), "connect");
        assert_eq!(TransportError::Request(String::new()).kind(), "request");
        assert_eq!(TransportError::Body(String::new()).kind(), "body");
        assert_eq!(
            TransportError::ClientBuild(String::new()).kind(),
            "client_build"
        );
    }

    #[test]
    fn test_is_timeout() {
        assert!(TransportError::Timeout("slow".to_string()).is_timeout());
        assert!(!TransportError::Connect("refused".to_string()).is_timeout());
    }

    #[test]
    fn test_display_messages() {
        let err = TransportError::Connect("Connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to connect to upstream: Connection refused"
        );
    }
}
