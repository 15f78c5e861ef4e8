#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Bootkit application wiring.
//!
//! Layout: `config.rs` (environment loading), `bootstrap.rs` (service wiring
//! and shutdown), `error.rs` (error type).

/// Application bootstrap and lifecycle.
pub mod bootstrap;
/// Environment-driven configuration.
pub mod config;
/// Application error type.
pub mod error;

pub use bootstrap::{RunningApp, run_app, run_app_with, start_app};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
