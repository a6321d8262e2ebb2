//! Load generator for `HelloService/SayHello`.

use clap::Parser;
use hello_load::{run, LoadOptions};
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hello-load")]
#[command(about = "Shared-iterations load test for the Hello World proto bridge", long_about = None)]
struct Cli {
    /// gRPC endpoint of the bridge.
    #[arg(short, long, default_value = "http://127.0.0.1:50051")]
    endpoint: String,

    /// Concurrent virtual users, each with its own connection.
    #[arg(long, default_value_t = 500)]
    vus: usize,

    /// Total calls shared across all virtual users.
    #[arg(short, long, default_value_t = 10_000)]
    iterations: usize,

    /// Per-call deadline in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hello_load=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let options = LoadOptions {
        endpoint: cli.endpoint,
        vus: cli.vus.max(1),
        iterations: cli.iterations,
        timeout: cli.timeout_ms.map(Duration::from_millis),
    };

    match run(&options).await {
        Ok(report) => {
            println!("{report}");
            if report.ok == 0 {
                error!("No call passed the status check");
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, "Load run failed");
            ExitCode::FAILURE
        }
    }
}
