//! Error types for logger construction.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while building or installing a logger.
#[derive(Debug)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// Opening or creating the log file failed.
    LogFileOpen {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// A verbosity level string was not recognised.
    InvalidLevel {
        /// Value supplied by the caller.
        value: String,
    },
    /// A log output format string was not recognised.
    InvalidFormat {
        /// Value supplied by the caller.
        value: String,
    },
    /// The level filter could not be built.
    InvalidFilter {
        /// Underlying directive parse error.
        source: tracing_subscriber::filter::ParseError,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
            Self::LogFileOpen { .. } => formatter.write_str("failed to open log file"),
            Self::InvalidLevel { value } => write!(formatter, "unknown log level: {value}"),
            Self::InvalidFormat { value } => write!(formatter, "unknown log format: {value}"),
            Self::InvalidFilter { .. } => formatter.write_str("invalid log level filter"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::LogFileOpen { source, .. } => Some(source),
            Self::InvalidFilter { source } => Some(source),
            Self::InvalidLevel { .. } | Self::InvalidFormat { .. } => None,
        }
    }
}
