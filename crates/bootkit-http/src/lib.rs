#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! HTTP server wrapper: an axum router plus bind options, started in the
//! background and stopped within a caller-supplied deadline.
//!
//! Layout: `server.rs` (options, lifecycle), `layers.rs` (request tracing
//! middleware), `error.rs` (error type).

pub mod error;
pub mod layers;
pub mod server;

pub use error::{HttpError, Result as HttpResult};
pub use layers::{HEADER_REQUEST_ID, with_request_tracing};
pub use server::{DEFAULT_HOST, DEFAULT_PORT, HttpServer, ServerConfig, ServerOption, ServerState};
