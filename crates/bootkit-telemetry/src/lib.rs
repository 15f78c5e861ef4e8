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

//! Logger factory: leveled, timestamped output teed to a rotating file and the console.
//!
//! Layout: `config.rs` (levels, formats, rotation bounds), `init.rs` (logger
//! construction and installation), `rotate.rs` (size-rotated file sink),
//! `error.rs` (error type).

pub mod config;
pub mod error;
pub mod init;
pub mod rotate;

pub use config::{DEFAULT_TIMESTAMP_FORMAT, LogFormat, LogLevel, LoggerConfig, RotationPolicy};
pub use error::{Result as TelemetryResult, TelemetryError};
pub use init::{Logger, fatal, new_logger};
pub use rotate::{Backup, RotatingFile};
