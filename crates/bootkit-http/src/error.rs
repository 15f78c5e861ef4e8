//! # Design
//!
//! - Provide a single crate-level error type for server lifecycle failures.
//! - Keep error messages constant; capture operational context in structured fields.
//! - Preserve sources for diagnostics without double-logging.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for HTTP server operations.
pub type Result<T> = std::result::Result<T, HttpError>;

/// Errors raised while starting the HTTP server.
#[derive(Debug)]
pub enum HttpError {
    /// Binding the listener failed.
    Bind {
        /// Host attempted.
        host: String,
        /// Port attempted.
        port: u16,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The bound listener could not be handed to the async runtime.
    Listener {
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// `start` was called outside a tokio runtime.
    NoRuntime,
    /// `start` was called on a server that is already serving.
    AlreadyRunning,
    /// `start` was called on a server that has been stopped.
    AlreadyStopped,
}

impl Display for HttpError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { .. } => formatter.write_str("failed to bind http listener"),
            Self::Listener { .. } => formatter.write_str("failed to prepare http listener"),
            Self::NoRuntime => formatter.write_str("http server requires a tokio runtime"),
            Self::AlreadyRunning => formatter.write_str("http server is already running"),
            Self::AlreadyStopped => formatter.write_str("http server has been stopped"),
        }
    }
}

impl Error for HttpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Bind { source, .. } | Self::Listener { source } => Some(source),
            Self::NoRuntime | Self::AlreadyRunning | Self::AlreadyStopped => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn http_error_display_and_source() {
        let bind = HttpError::Bind {
            host: "127.0.0.1".to_string(),
            port: 8080,
            source: io::Error::new(io::ErrorKind::AddrInUse, "busy"),
        };
        assert_eq!(bind.to_string(), "failed to bind http listener");
        assert!(bind.source().is_some());

        let listener = HttpError::Listener {
            source: io::Error::other("nonblocking"),
        };
        assert_eq!(listener.to_string(), "failed to prepare http listener");
        assert!(listener.source().is_some());

        for (err, message) in [
            (HttpError::NoRuntime, "http server requires a tokio runtime"),
            (HttpError::AlreadyRunning, "http server is already running"),
            (HttpError::AlreadyStopped, "http server has been stopped"),
        ] {
            assert_eq!(err.to_string(), message);
            assert!(err.source().is_none());
        }
    }
}
