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

//! Database handle factory for Postgres, `MySQL`, and `SQLite`.
//!
//! Layout: `backend.rs` (backend selector, options, connection strings),
//! `connect.rs` (opening handles, migrations), `error.rs` (error type).

pub mod backend;
pub mod connect;
pub mod error;

pub use backend::{BackendKind, ConnectOption, ConnectionParams};
pub use connect::{DEFAULT_SLOW_QUERY_THRESHOLD, DatabaseHandle, OpenSettings, open, open_with};
pub use error::{DataError, Result as DataResult};
