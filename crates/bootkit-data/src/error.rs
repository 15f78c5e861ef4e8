//! Error types for the database factory.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::backend::BackendKind;

/// Result alias for database factory operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised while building or using a database handle.
#[derive(Debug)]
pub enum DataError {
    /// The requested backend is not one of the supported dialects.
    UnsupportedBackend {
        /// Backend selector as supplied by the caller.
        backend: String,
    },
    /// A parameter required by the backend was never supplied.
    MissingParameter {
        /// Backend that required the parameter.
        kind: BackendKind,
        /// Parameter name.
        field: &'static str,
    },
    /// The connection string could not be assembled.
    InvalidConnectionString {
        /// Backend the string was built for.
        kind: BackendKind,
        /// Underlying URL error.
        source: url::ParseError,
    },
    /// The connection string had no place for a supplied parameter.
    FieldRejected {
        /// Backend the string was built for.
        kind: BackendKind,
        /// Parameter that could not be set.
        field: &'static str,
    },
    /// sqlx rejected the rendered connection string.
    InvalidOptions {
        /// Backend the options were parsed for.
        kind: BackendKind,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// Establishing the connection pool failed.
    ConnectFailed {
        /// Backend that failed to connect.
        kind: BackendKind,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// Migration execution failed.
    MigrationFailed {
        /// Underlying migration error.
        source: sqlx::migrate::MigrateError,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBackend { backend } => {
                write!(formatter, "unsupported database backend: {backend}")
            }
            Self::MissingParameter { kind, field } => {
                write!(formatter, "{kind} connection requires a {field}")
            }
            Self::InvalidConnectionString { kind, .. } => {
                write!(formatter, "failed to build {kind} connection string")
            }
            Self::FieldRejected { kind, field } => {
                write!(formatter, "{kind} connection string cannot carry a {field}")
            }
            Self::InvalidOptions { kind, .. } => {
                write!(formatter, "invalid {kind} connection options")
            }
            Self::ConnectFailed { kind, .. } => {
                write!(formatter, "can't connect to {kind} database")
            }
            Self::MigrationFailed { .. } => formatter.write_str("migration failed"),
            Self::QueryFailed { .. } => formatter.write_str("database operation failed"),
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnsupportedBackend { .. }
            | Self::MissingParameter { .. }
            | Self::FieldRejected { .. } => None,
            Self::InvalidConnectionString { source, .. } => Some(source),
            Self::InvalidOptions { source, .. }
            | Self::ConnectFailed { source, .. }
            | Self::QueryFailed { source, .. } => Some(source),
            Self::MigrationFailed { source } => Some(source),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(source: sqlx::Error) -> Self {
        Self::QueryFailed {
            operation: "sqlx operation",
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_display_and_source() {
        let unsupported = DataError::UnsupportedBackend {
            backend: "oracle".to_string(),
        };
        assert_eq!(
            unsupported.to_string(),
            "unsupported database backend: oracle"
        );
        assert!(unsupported.source().is_none());

        let missing = DataError::MissingParameter {
            kind: BackendKind::Sqlite,
            field: "path",
        };
        assert_eq!(missing.to_string(), "sqlite connection requires a path");
        assert!(missing.source().is_none());

        let connect = DataError::ConnectFailed {
            kind: BackendKind::Postgres,
            source: sqlx::Error::PoolTimedOut,
        };
        assert_eq!(connect.to_string(), "can't connect to postgres database");
        assert!(connect.source().is_some());

        let rejected = DataError::FieldRejected {
            kind: BackendKind::MySql,
            field: "password",
        };
        assert_eq!(
            rejected.to_string(),
            "mysql connection string cannot carry a password"
        );
        assert!(rejected.source().is_none());

        let options = DataError::InvalidOptions {
            kind: BackendKind::Postgres,
            source: sqlx::Error::Configuration("bad sslmode".into()),
        };
        assert_eq!(options.to_string(), "invalid postgres connection options");
        assert!(options.source().is_some());

        let migration = DataError::MigrationFailed {
            source: sqlx::migrate::MigrateError::VersionMissing(1),
        };
        assert_eq!(migration.to_string(), "migration failed");
        assert!(migration.source().is_some());

        let from = DataError::from(sqlx::Error::RowNotFound);
        assert_eq!(from.to_string(), "database operation failed");
        assert!(from.source().is_some());
    }
}
