//! Middleware shared by the services' HTTP routers.

mod http_metrics;

pub use http_metrics::http_metrics_middleware;
