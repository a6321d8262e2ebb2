//! Server supervision and bounded shutdown.
//!
//! The bridge runs two servers (gRPC and health HTTP) that share one
//! cancellation token. Whatever ends the run, a shutdown signal or either
//! server stopping on its own, the token is cancelled and every server still
//! running gets the same bounded drain period before the run returns.

use crate::errors::BridgeError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type ServerTask<E> = JoinHandle<Result<(), E>>;

/// Wait for `shutdown` or the first server exit, then cancel and drain.
///
/// `token` must be the parent of the tokens both servers shut down on.
///
/// # Errors
///
/// Returns `BridgeError::Server` if a server stopped before `shutdown`
/// resolved. The other server has been drained (or the drain period has
/// elapsed) by the time the error is returned.
pub async fn supervise<G, H>(
    shutdown: impl Future<Output = ()>,
    token: &CancellationToken,
    mut grpc_task: ServerTask<G>,
    mut health_task: ServerTask<H>,
    drain: Duration,
) -> Result<(), BridgeError>
where
    G: Display,
    H: Display,
{
    let exit = tokio::select! {
        () = shutdown => Exit::Signal,
        result = &mut grpc_task => Exit::Grpc(exit_reason("gRPC", result)),
        result = &mut health_task => Exit::Health(exit_reason("Health", result)),
    };

    // Propagates to both servers via child tokens.
    token.cancel();

    // A handle that already resolved in the select must not be polled again.
    match exit {
        Exit::Signal => {
            info!(
                drain_seconds = drain.as_secs(),
                "Shutdown signal received, draining in-flight calls..."
            );
            drain_within(drain, async {
                let (grpc, health) = tokio::join!(grpc_task, health_task);
                log_shutdown("gRPC", grpc);
                log_shutdown("Health", health);
            })
            .await;
            Ok(())
        }
        Exit::Grpc(reason) => {
            error!(reason = %reason, "gRPC server exited, stopping health server");
            drain_within(drain, async { log_shutdown("Health", health_task.await) }).await;
            Err(BridgeError::Server(reason))
        }
        Exit::Health(reason) => {
            error!(reason = %reason, "Health server exited, stopping gRPC server");
            drain_within(drain, async { log_shutdown("gRPC", grpc_task.await) }).await;
            Err(BridgeError::Server(reason))
        }
    }
}

enum Exit {
    Signal,
    Grpc(String),
    Health(String),
}

async fn drain_within(drain: Duration, servers: impl Future<Output = ()>) {
    if tokio::time::timeout(drain, servers).await.is_err() {
        warn!("Drain period elapsed with calls still in flight");
    }
}

fn log_shutdown<E: Display>(server: &str, result: Result<Result<(), E>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(server, error = %e, "Server reported an error during shutdown"),
        Err(e) => warn!(server, error = %e, "Server task failed during shutdown"),
    }
}

fn exit_reason<E: Display>(server: &str, result: Result<Result<(), E>, JoinError>) -> String {
    match result {
        Ok(Ok(())) => format!("{server} server stopped unexpectedly"),
        Ok(Err(e)) => format!("{server} server failed: {e}"),
        Err(e) => format!("{server} server task failed: {e}"),
    }
}
