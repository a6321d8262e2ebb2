//! Hello World responder
//!
//! Answers `GET /hello-world` with the plain-text body `Hello World!`. This
//! is the upstream the proto bridge and the JSON responder call.

pub mod config;
pub mod routes;
