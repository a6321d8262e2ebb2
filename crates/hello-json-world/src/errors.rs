//! JSON responder error types.
//!
//! Upstream failures map to `503 Service Unavailable` with a JSON error body.
//! The transport detail is logged server-side and never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::TransportError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonWorldError {
    #[error("Upstream call failed: {0}")]
    Upstream(#[from] TransportError),
}

impl JsonWorldError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            JsonWorldError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for JsonWorldError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let JsonWorldError::Upstream(err) = &self;
        tracing::warn!(
            target: "hello.json.availability",
            error = %err,
            kind = err.kind(),
            "Upstream unavailable"
        );

        let (code, message) = if err.is_timeout() {
            ("UPSTREAM_TIMEOUT", "Hello World upstream timed out")
        } else {
            ("UPSTREAM_UNAVAILABLE", "Hello World upstream is unavailable")
        };

        let body = ErrorResponse {
            error: ErrorDetail { code, message },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn read_body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_connect_failure_is_503_without_detail() {
        let error = JsonWorldError::from(TransportError::Connect(
            "tcp connect error: 10.0.0.7:8080".to_string(),
        ));
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = read_body_json(response).await;
        assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
        assert!(!body.to_string().contains("10.0.0.7"));
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn test_timeout_has_its_own_code() {
        let response =
            JsonWorldError::from(TransportError::Timeout("deadline".to_string())).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = read_body_json(response).await;
        assert_eq!(body["error"]["code"], "UPSTREAM_TIMEOUT");
    }

    #[test]
    fn test_response_status_follows_status_code() {
        let errors = [
            TransportError::Connect("refused".to_string()),
            TransportError::Timeout("deadline".to_string()),
            TransportError::Request("reset".to_string()),
            TransportError::Body("truncated".to_string()),
        ];

        for transport in errors {
            let error = JsonWorldError::from(transport);
            let expected = error.status_code();
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
