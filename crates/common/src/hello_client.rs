//! Outbound client for the upstream Hello World service.
//!
//! One `HelloWorldClient` per process serves all request traffic. It keeps
//! a pool of keep-alive connections to the single configured upstream and
//! retires the whole pool once it is older than the configured lifetime,
//! so DNS changes and rebalanced backends are picked up without any signal
//! from callers.
//!
//! # Pool generations
//!
//! Each pool lives inside a [`reqwest::Client`]. The current client is held
//! in an [`ArcSwap`]; callers take a cheap `Arc` snapshot per request and
//! never lock. When the snapshot is past its lifetime the caller builds a
//! replacement and publishes it with compare-and-swap; a caller that loses
//! the race uses the winner's client. Requests already running on the old
//! generation finish on it, and its connections close when the last
//! snapshot is dropped.

use crate::config::UpstreamConfig;
use crate::error::TransportError;
use crate::observability::Observer;
use arc_swap::ArcSwap;
use reqwest::Url;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Fixed path requested on the upstream.
pub const HELLO_WORLD_PATH: &str = "/hello-world";

/// Metric `operation` label for [`HelloWorldClient::get_hello_world`].
pub const HELLO_WORLD_OPERATION: &str = "hello_world";

/// Metric `operation` label for [`HelloWorldClient::get_hello_world_for_health`].
pub const HEALTH_CHECK_OPERATION: &str = "health_check";

/// Idle pooled connections are closed after this long, or after the pool
/// lifetime if that is shorter.
const MAX_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

struct PoolGeneration {
    id: u64,
    client: reqwest::Client,
    created_at: Instant,
}

impl PoolGeneration {
    fn build(id: u64, config: &UpstreamConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pooled_connection_lifetime.min(MAX_POOL_IDLE_TIMEOUT))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(Self {
            id,
            client,
            created_at: Instant::now(),
        })
    }

    fn is_expired(&self, lifetime: Duration) -> bool {
        self.created_at.elapsed() >= lifetime
    }
}

/// Pooled HTTP client for `GET /hello-world`.
///
/// Safe to share across any number of concurrent tasks (`Arc<HelloWorldClient>`).
pub struct HelloWorldClient {
    endpoint: Url,
    config: UpstreamConfig,
    generation: ArcSwap<PoolGeneration>,
    observer: Observer,
}

impl HelloWorldClient {
    /// Create a client for the configured upstream.
    ///
    /// No connection is opened until the first call.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ClientBuild` if the endpoint URL cannot be
    /// formed or the HTTP client cannot be constructed.
    pub fn new(config: UpstreamConfig, observer: Observer) -> Result<Self, TransportError> {
        let endpoint = config.base_url.join(HELLO_WORLD_PATH).map_err(|e| {
            TransportError::ClientBuild(format!("Invalid upstream endpoint: {e}"))
        })?;

        let initial = PoolGeneration::build(0, &config)?;

        Ok(Self {
            endpoint,
            config,
            generation: ArcSwap::from_pointee(initial),
            observer,
        })
    }

    /// Absolute URL requested on every call.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Identifier of the connection pool currently serving new requests.
    ///
    /// Starts at 0 and increases by one per retired pool.
    pub fn pool_generation(&self) -> u64 {
        self.generation.load().id
    }

    /// Perform one `GET /hello-world` and return the body as text.
    ///
    /// The status code is not inspected: a `503` with body `"down"` yields
    /// `Ok("down")`. Bodies that are not valid UTF-8 are decoded lossily.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the upstream could not be reached, the
    /// call timed out, or the body could not be read.
    pub async fn get_hello_world(&self) -> Result<String, TransportError> {
        self.call(HELLO_WORLD_OPERATION).await
    }

    /// Same call as [`get_hello_world`](Self::get_hello_world), recorded
    /// under `operation="health_check"` instead of `hello_world`.
    ///
    /// # Errors
    ///
    /// As for [`get_hello_world`](Self::get_hello_world).
    pub async fn get_hello_world_for_health(&self) -> Result<String, TransportError> {
        self.call(HEALTH_CHECK_OPERATION).await
    }

    #[instrument(
        skip_all,
        name = "hello.upstream.get_hello_world",
        fields(
            url = %self.endpoint,
            operation = operation,
            pool_generation = tracing::field::Empty
        )
    )]
    async fn call(&self, operation: &'static str) -> Result<String, TransportError> {
        let start = Instant::now();
        let result = self.fetch().await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) if e.is_timeout() => "timeout",
            Err(_) => "error",
        };
        self.observer.record_upstream_request(operation, status, start.elapsed());

        if let Err(e) = &result {
            warn!(
                target: "hello.common.hello_client",
                error = %e,
                kind = e.kind(),
                "Upstream Hello World call failed"
            );
        }

        result
    }

    async fn fetch(&self) -> Result<String, TransportError> {
        let generation = self.current_generation()?;
        tracing::Span::current().record("pool_generation", generation.id);

        let response = generation
            .client
            .get(self.endpoint.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(
                target: "hello.common.hello_client",
                status = status.as_u16(),
                "Upstream returned non-success status, passing body through"
            );
        }

        Ok(response.text().await?)
    }

    /// Snapshot of the live pool, rotating it first if it has expired.
    fn current_generation(&self) -> Result<Arc<PoolGeneration>, TransportError> {
        let current = self.generation.load_full();
        if !current.is_expired(self.config.pooled_connection_lifetime) {
            return Ok(current);
        }

        let fresh = Arc::new(PoolGeneration::build(current.id + 1, &self.config)?);

        let previous = self
            .generation
            .compare_and_swap(&current, Arc::clone(&fresh));

        if Arc::ptr_eq(&*previous, &current) {
            debug!(
                target: "hello.common.hello_client",
                retired = current.id,
                current = fresh.id,
                age_ms = current.created_at.elapsed().as_millis() as u64,
                "Retired upstream connection pool"
            );
            self.observer.record_pool_rotation();
            Ok(fresh)
        } else {
            // Another caller rotated first.
            Ok(arc_swap::Guard::into_inner(previous))
        }
    }
}
