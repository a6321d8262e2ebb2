//! Generated gRPC bindings for the Hello World bridge.
//!
//! `google.protobuf.Empty` maps to `()`. The service is declared without a
//! proto package, so its RPC path is `/HelloService/SayHello`.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // Generated code has various doc formatting

// Re-export prost traits for convenience
pub use prost::Message;

pub mod hello {
    //! `HelloService` messages, client and server
    include!("generated/hello.rs");
}
