//! Test utilities for the hello-world services
//!
//! - [`TestBridgeServer`]: a real proto bridge (gRPC + health HTTP) on random ports
//! - [`MockUpstream`]: scriptable Hello World upstream, re-exported from `common`

pub mod server_harness;

pub use common::testing::{unreachable_base_url, MockResponse, MockUpstream};
pub use server_harness::TestBridgeServer;
