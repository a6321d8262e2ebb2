//! Hello JSON World
//!
//! Calls the upstream Hello World service through one pooled client and
//! answers `GET /hello-json-world` with `{"result": "<upstream body>"}`.

pub mod config;
pub mod errors;
pub mod routes;
