//! Load generator for the proto bridge.
//!
//! A fixed pool of virtual users shares one iteration budget. Each user opens
//! one channel up front and reuses it for every call it makes; a call passes
//! its check when the RPC ends with status `OK`.

pub mod report;
pub mod runner;

pub use report::LoadReport;
pub use runner::{run, LoadOptions};
