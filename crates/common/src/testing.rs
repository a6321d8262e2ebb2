//! Test support: a stand-in for the Hello World upstream.
//!
//! [`MockUpstream`] is a small axum app served with connect info, so every
//! request knows the peer address it arrived on. Distinct peers are distinct
//! TCP connections, which lets tests assert connection reuse from the
//! outside. Scripted status, body and delay cases use `wiremock` directly.

use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One scripted response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    /// `200 OK` with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

type Responder = dyn Fn(usize) -> MockResponse + Send + Sync;

struct MockState {
    peers: Mutex<HashSet<SocketAddr>>,
    requests: AtomicUsize,
    paths: Mutex<Vec<String>>,
    responder: Box<Responder>,
}

/// In-process HTTP upstream bound to `127.0.0.1` on a random port.
///
/// The responder receives the zero-based index of each request in arrival
/// order. The server task stops when the mock is dropped.
pub struct MockUpstream {
    addr: SocketAddr,
    state: Arc<MockState>,
    server_task: JoinHandle<()>,
}

impl MockUpstream {
    /// Start a mock whose responses are produced by `responder`.
    pub async fn start<F>(responder: F) -> io::Result<Self>
    where
        F: Fn(usize) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockState {
            peers: Mutex::new(HashSet::new()),
            requests: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        });

        let app = Router::new()
            .fallback(respond)
            .with_state(Arc::clone(&state));

        let server_task = tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });

        Ok(Self {
            addr,
            state,
            server_task,
        })
    }

    /// Mock that always answers `200 Hello World!`.
    pub async fn hello_world() -> io::Result<Self> {
        Self::start(|_| MockResponse::ok("Hello World!")).await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL suitable for `HELLO_WORLD_BASE_URL`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of distinct client connections that carried a request.
    pub fn connection_count(&self) -> usize {
        self.state
            .peers
            .lock()
            .map(|peers| peers.len())
            .unwrap_or_default()
    }

    /// Number of requests answered (or being answered) so far.
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Request paths in arrival order.
    pub fn request_paths(&self) -> Vec<String> {
        self.state
            .paths
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}

async fn respond(
    State(state): State<Arc<MockState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> impl IntoResponse {
    if let Ok(mut peers) = state.peers.lock() {
        peers.insert(peer);
    }
    if let Ok(mut paths) = state.paths.lock() {
        paths.push(uri.path().to_string());
    }
    let index = state.requests.fetch_add(1, Ordering::SeqCst);

    let response = (state.responder)(index);
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        response.body,
    )
}

/// A base URL nothing is listening on.
///
/// Binds an ephemeral port and releases it, so connections are refused.
pub fn unreachable_base_url() -> io::Result<String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn get(client: &reqwest::Client, url: &str) -> (u16, String) {
        let response = client.get(url).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    #[tokio::test]
    async fn test_keep_alive_requests_count_as_one_connection() {
        let upstream = MockUpstream::hello_world().await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/hello-world", upstream.base_url());

        for _ in 0..3 {
            assert_eq!(get(&client, &url).await, (200, "Hello World!".to_string()));
        }

        assert_eq!(upstream.request_count(), 3);
        assert_eq!(upstream.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_separate_clients_count_as_separate_connections() {
        let upstream = MockUpstream::hello_world().await.unwrap();
        let url = format!("{}/hello-world", upstream.base_url());

        get(&reqwest::Client::new(), &url).await;
        get(&reqwest::Client::new(), &url).await;

        assert_eq!(upstream.connection_count(), 2);
    }

    #[tokio::test]
    async fn test_responder_sees_arrival_index_and_status() {
        let upstream = MockUpstream::start(|n| match n {
            0 => MockResponse::ok("first"),
            _ => MockResponse::with_status(503, "later"),
        })
        .await
        .unwrap();
        let client = reqwest::Client::new();

        let first = get(&client, &format!("{}/hello-world", upstream.base_url())).await;
        let second = get(&client, &format!("{}/other", upstream.base_url())).await;

        assert_eq!(first, (200, "first".to_string()));
        assert_eq!(second, (503, "later".to_string()));
        assert_eq!(
            upstream.request_paths(),
            vec!["/hello-world".to_string(), "/other".to_string()]
        );
    }

    #[test]
    fn test_unreachable_base_url_is_http() {
        let url = unreachable_base_url().unwrap();
        assert!(url.starts_with("http://127.0.0.1:"));
    }
}
