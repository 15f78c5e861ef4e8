//! # Design
//!
//! - Centralize application-level errors for configuration and bootstrap.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::error::Error as _;

use bootkit_data::DataError;
use bootkit_http::HttpError;
use bootkit_telemetry::TelemetryError;
use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Environment configuration was missing.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Environment variable that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value.
        value: Option<String>,
    },
    /// Database operations failed.
    #[error("database operation failed")]
    Data {
        /// Operation identifier.
        operation: &'static str,
        /// Source data error.
        source: DataError,
    },
    /// Loading migrations from disk failed.
    #[error("migration loading failed")]
    Migrations {
        /// Operation identifier.
        operation: &'static str,
        /// Source migration error.
        source: sqlx::migrate::MigrateError,
    },
    /// HTTP server operations failed.
    #[error("http server operation failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Source HTTP server error.
        source: HttpError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
}

impl AppError {
    pub(crate) const fn data(operation: &'static str, source: DataError) -> Self {
        Self::Data { operation, source }
    }

    pub(crate) const fn migrations(
        operation: &'static str,
        source: sqlx::migrate::MigrateError,
    ) -> Self {
        Self::Migrations { operation, source }
    }

    pub(crate) const fn http(operation: &'static str, source: HttpError) -> Self {
        Self::Http { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    /// Message and every source, joined with `": "`.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootkit_data::BackendKind;
    use std::error::Error;

    #[test]
    fn app_error_helpers_build_variants() {
        let data = AppError::data(
            "database.open",
            DataError::MissingParameter {
                kind: BackendKind::Sqlite,
                field: "path",
            },
        );
        assert!(matches!(
            data,
            AppError::Data {
                operation: "database.open",
                ..
            }
        ));
        assert!(data.source().is_some());

        let http = AppError::http("server.start", HttpError::AlreadyRunning);
        assert!(matches!(http, AppError::Http { .. }));

        let telemetry = AppError::telemetry(
            "logger.build",
            TelemetryError::InvalidLevel {
                value: "loud".to_string(),
            },
        );
        assert!(matches!(telemetry, AppError::Telemetry { .. }));

        let migrations = AppError::migrations(
            "migrations.load",
            sqlx::migrate::MigrateError::VersionMissing(3),
        );
        assert_eq!(migrations.to_string(), "migration loading failed");
    }

    #[test]
    fn chain_includes_sources() {
        let err = AppError::data(
            "database.open",
            DataError::MissingParameter {
                kind: BackendKind::Postgres,
                field: "host",
            },
        );
        assert_eq!(
            err.chain(),
            "database operation failed: postgres connection requires a host"
        );

        let missing = AppError::MissingEnv {
            name: "BOOTKIT_DB_KIND",
        };
        assert_eq!(missing.chain(), "missing environment configuration");
    }
}
