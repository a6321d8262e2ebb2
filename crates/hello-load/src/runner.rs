//! Virtual-user scheduling.

use crate::report::{LoadReport, VuStats};
use proto_gen::hello::hello_service_client::HelloServiceClient;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tonic::transport::{Channel, Endpoint};
use tonic::Request;
use tracing::{debug, info, warn};

/// Run parameters.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// gRPC endpoint, e.g. `http://127.0.0.1:50051`.
    pub endpoint: String,
    /// Concurrent virtual users.
    pub vus: usize,
    /// Calls shared across all users.
    pub iterations: usize,
    /// Per-call deadline, sent as `grpc-timeout` and enforced client-side.
    pub timeout: Option<Duration>,
}

/// Drive `options.iterations` calls through `options.vus` users.
///
/// # Errors
///
/// Returns an error if the endpoint is not a valid URI or a user task panics.
pub async fn run(options: &LoadOptions) -> anyhow::Result<LoadReport> {
    let mut endpoint = Endpoint::from_shared(options.endpoint.clone())?;
    if let Some(timeout) = options.timeout {
        endpoint = endpoint.timeout(timeout);
    }

    info!(
        endpoint = %options.endpoint,
        vus = options.vus,
        iterations = options.iterations,
        "Starting load run"
    );

    let next_iteration = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();

    let mut users = Vec::with_capacity(options.vus);
    for vu in 0..options.vus {
        let endpoint = endpoint.clone();
        let next_iteration = Arc::clone(&next_iteration);
        let iterations = options.iterations;
        let timeout = options.timeout;
        users.push(tokio::spawn(async move {
            virtual_user(vu, endpoint, next_iteration, iterations, timeout).await
        }));
    }

    let mut stats = Vec::with_capacity(users.len());
    for user in users {
        stats.push(user.await?);
    }

    Ok(LoadReport::from_vus(stats, started.elapsed()))
}

async fn virtual_user(
    vu: usize,
    endpoint: Endpoint,
    next_iteration: Arc<AtomicUsize>,
    iterations: usize,
    timeout: Option<Duration>,
) -> VuStats {
    let mut stats = VuStats::default();

    // One connection per user, reused for every call it makes.
    let channel: Channel = match endpoint.connect().await {
        Ok(channel) => channel,
        Err(e) => {
            warn!(vu, error = %e, "Virtual user failed to connect");
            stats.connect_failed = true;
            return stats;
        }
    };
    let mut client = HelloServiceClient::new(channel);

    while next_iteration.fetch_add(1, Ordering::Relaxed) < iterations {
        let mut request = Request::new(());
        if let Some(timeout) = timeout {
            request.set_timeout(timeout);
        }

        let start = Instant::now();
        let outcome = client.say_hello(request).await;
        let latency = start.elapsed();

        match outcome {
            Ok(_) => stats.record_ok(latency),
            Err(status) => {
                debug!(vu, code = ?status.code(), message = status.message(), "Call failed");
                stats.record_failure(format!("{:?}", status.code()), latency);
            }
        }
    }

    stats
}
