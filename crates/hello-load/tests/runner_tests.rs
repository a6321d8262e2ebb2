//! Runs the load generator against an in-process `HelloService`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hello_load::{run, LoadOptions};
use proto_gen::hello::hello_service_server::{HelloService, HelloServiceServer};
use proto_gen::hello::HelloReply;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// Fails every `fail_every`-th call with `UNAVAILABLE`; 0 never fails.
struct CountingService {
    calls: Arc<AtomicUsize>,
    fail_every: usize,
}

#[tonic::async_trait]
impl HelloService for CountingService {
    async fn say_hello(&self, _request: Request<()>) -> Result<Response<HelloReply>, Status> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every != 0 && n % self.fail_every == 0 {
            return Err(Status::unavailable("upstream down"));
        }
        Ok(Response::new(HelloReply {
            result: "Hello World!".to_string(),
        }))
    }
}

async fn spawn_service(fail_every: usize) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let service = CountingService {
        calls: Arc::clone(&calls),
        fail_every,
    };
    tokio::spawn(async move {
        Server::builder()
            .add_service(HelloServiceServer::new(service))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    (format!("http://{addr}"), calls)
}

fn options(endpoint: String, vus: usize, iterations: usize) -> LoadOptions {
    LoadOptions {
        endpoint,
        vus,
        iterations,
        timeout: None,
    }
}

#[tokio::test]
async fn test_iterations_are_shared_across_users() {
    let (endpoint, calls) = spawn_service(0).await;

    let report = run(&options(endpoint, 8, 100)).await.unwrap();

    assert_eq!(report.vus, 8);
    assert_eq!(report.total(), 100);
    assert_eq!(report.ok, 100);
    assert_eq!(calls.load(Ordering::SeqCst), 100);
    assert!(report.percentile(99.0).is_some());
}

#[tokio::test]
async fn test_failed_calls_are_counted_by_code() {
    let (endpoint, _) = spawn_service(4).await;

    let report = run(&options(endpoint, 2, 40)).await.unwrap();

    assert_eq!(report.total(), 40);
    assert_eq!(report.failures.get("Unavailable"), Some(&10));
    assert_eq!(report.ok, 30);
}

#[tokio::test]
async fn test_unreachable_endpoint_makes_no_calls() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let report = run(&options(format!("http://{addr}"), 3, 10)).await.unwrap();

    assert_eq!(report.total(), 0);
    assert_eq!(report.connect_failures, 3);
}

#[tokio::test]
async fn test_invalid_endpoint_is_an_error() {
    assert!(run(&options("not a uri".to_string(), 1, 1)).await.is_err());
}
