//! Tower layer that traces and times every inbound gRPC call.
//!
//! Opens the `hello.grpc.request` span that the handler and the outbound
//! client spans nest under, and records `hello_grpc_request_duration_seconds`
//! once the call ends. A call whose future is dropped before completing
//! (client cancel, expired `grpc-timeout`) is recorded as `CANCELLED`.

use axum::http;
use common::observability::Observer;
use proto_gen::hello::hello_service_server::SERVICE_NAME;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tonic::body::BoxBody;
use tonic::Code;
use tower::{Layer, Service};
use tracing::{info_span, Instrument, Span};

/// Label used for paths outside the served service, to bound cardinality.
const OTHER_LABEL: &str = "other";

/// Tower layer for gRPC call metrics.
#[derive(Clone)]
pub struct GrpcMetricsLayer {
    observer: Observer,
}

impl GrpcMetricsLayer {
    pub fn new(observer: Observer) -> Self {
        Self { observer }
    }
}

impl<S> Layer<S> for GrpcMetricsLayer {
    type Service = GrpcMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GrpcMetricsService {
            inner,
            observer: self.observer.clone(),
        }
    }
}

/// Tower service for gRPC call metrics.
#[derive(Clone)]
pub struct GrpcMetricsService<S> {
    inner: S,
    observer: Observer,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for GrpcMetricsService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        // Use the clone that was not driven to readiness for later calls.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let (service, method) = rpc_labels(req.uri().path());
        let span = info_span!(
            "hello.grpc.request",
            rpc.service = service,
            rpc.method = method,
            rpc.grpc.status_code = tracing::field::Empty,
        );

        let mut call = CallRecord {
            observer: self.observer.clone(),
            service,
            method,
            start: Instant::now(),
            span: span.clone(),
            finished: false,
        };

        Box::pin(
            async move {
                let result = inner.call(req).await;
                let code = match &result {
                    Ok(response) => response_code(response),
                    Err(_) => Code::Unknown as i32,
                };
                call.finish(code);
                result
            }
            .instrument(span),
        )
    }
}

/// Completion bookkeeping for one call; records `CANCELLED` if dropped
/// before [`CallRecord::finish`].
struct CallRecord {
    observer: Observer,
    service: &'static str,
    method: &'static str,
    start: Instant,
    span: Span,
    finished: bool,
}

impl CallRecord {
    fn finish(&mut self, code: i32) {
        self.finished = true;
        self.span.record("rpc.grpc.status_code", code);
        self.observer
            .record_grpc_request(self.service, self.method, code, self.start.elapsed());
    }
}

impl Drop for CallRecord {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Code::Cancelled as i32);
        }
    }
}

/// Bounded `(service, method)` labels for a gRPC request path.
fn rpc_labels(path: &str) -> (&'static str, &'static str) {
    let mut parts = path.trim_start_matches('/').splitn(2, '/');
    match (parts.next(), parts.next()) {
        (Some(service), Some("SayHello")) if service == SERVICE_NAME => {
            (SERVICE_NAME, "SayHello")
        }
        _ => (OTHER_LABEL, OTHER_LABEL),
    }
}

/// gRPC status of a response.
///
/// Errors are trailers-only responses with `grpc-status` in the headers. A
/// response without the header carries its status in trailers, which for a
/// unary call that produced a body is `OK`.
fn response_code(response: &http::Response<BoxBody>) -> i32 {
    response
        .headers()
        .get("grpc-status")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(Code::Ok as i32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::time::Duration;
    use tower::ServiceExt;

    #[test]
    fn test_rpc_labels_for_say_hello() {
        assert_eq!(
            rpc_labels("/HelloService/SayHello"),
            ("HelloService", "SayHello")
        );
    }

    #[test]
    fn test_rpc_labels_bound_unknown_paths() {
        assert_eq!(rpc_labels("/HelloService/SayGoodbye"), ("other", "other"));
        assert_eq!(rpc_labels("/pkg.HelloService/SayHello"), ("other", "other"));
        assert_eq!(rpc_labels("/"), ("other", "other"));
    }

    #[test]
    fn test_response_code_from_headers() {
        let ok = http::Response::new(tonic::body::empty_body());
        assert_eq!(response_code(&ok), 0);

        let unavailable: http::Response<BoxBody> = tonic::Status::unavailable("down").into_http();
        assert_eq!(response_code(&unavailable), Code::Unavailable as i32);
    }

    #[tokio::test]
    async fn test_layer_passes_response_through() {
        let inner = tower::service_fn(|_req: http::Request<()>| async {
            let response: http::Response<BoxBody> = tonic::Status::unavailable("down").into_http();
            Ok::<_, Infallible>(response)
        });
        let service = GrpcMetricsLayer::new(Observer::disabled()).layer(inner);

        let request = http::Request::builder()
            .uri("/HelloService/SayHello")
            .body(())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response_code(&response), Code::Unavailable as i32);
    }

    #[tokio::test]
    async fn test_dropped_call_is_recorded_as_cancelled() {
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        // current-thread runtime: the thread-local recorder sees every record.
        let _guard = metrics::set_default_local_recorder(&recorder);

        let inner = tower::service_fn(|_req: http::Request<()>| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, Infallible>(http::Response::new(tonic::body::empty_body()))
        });
        let service = GrpcMetricsLayer::new(Observer::enabled()).layer(inner);

        let request = http::Request::builder()
            .uri("/HelloService/SayHello")
            .body(())
            .unwrap();
        let result =
            tokio::time::timeout(Duration::from_millis(50), service.oneshot(request)).await;
        assert!(result.is_err());

        let snapshot = snapshotter.snapshot().into_vec();
        let cancelled = snapshot.iter().find(|(key, _, _, _)| {
            key.key().name() == "hello_grpc_requests_total"
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == "code" && l.value() == "1")
        });
        assert!(matches!(cancelled, Some((_, _, _, DebugValue::Counter(1)))));
    }
}
