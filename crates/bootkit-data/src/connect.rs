//! Opening database handles for the supported backends.
//!
//! # Design
//! - Typed sqlx connect options are parsed from the rendered connection
//!   string, so the string and the opened handle always agree.
//! - Statement logging is routed to the `log` facade with a slow-query threshold.
//! - Failures are returned to the caller, who decides whether they are fatal.

use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use sqlx::migrate::Migrator;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool};
use sqlx::postgres::{PgConnectOptions, PgPool};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::ConnectOptions;
use tracing::{debug, info};

use crate::backend::{BackendKind, ConnectOption, ConnectionParams};
use crate::error::{DataError, Result};

/// Statements slower than this are logged at warn level.
pub const DEFAULT_SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(200);

/// Tunables applied when opening a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenSettings {
    /// Threshold above which statements are reported as slow.
    pub slow_query_threshold: Duration,
    /// Level used for slow statement reports.
    pub slow_query_level: LevelFilter,
    /// Level used for regular statement logging.
    pub statement_level: LevelFilter,
    /// Keep foreign-key enforcement on while migrations run.
    pub foreign_keys_during_migration: bool,
}

impl Default for OpenSettings {
    fn default() -> Self {
        Self {
            slow_query_threshold: DEFAULT_SLOW_QUERY_THRESHOLD,
            slow_query_level: LevelFilter::Warn,
            statement_level: LevelFilter::Debug,
            foreign_keys_during_migration: false,
        }
    }
}

/// Open database handle for one of the supported backends.
#[derive(Debug, Clone)]
pub enum DatabaseHandle {
    /// `PostgreSQL` pool.
    Postgres(PgPool),
    /// `MySQL` pool.
    MySql(MySqlPool),
    /// `SQLite` pool.
    Sqlite(SqlitePool),
}

/// Open a handle for `kind`, applying `options` in order over the backend defaults.
///
/// # Errors
///
/// Returns an error when required parameters are missing or the connection
/// cannot be established.
pub async fn open(
    kind: BackendKind,
    options: impl IntoIterator<Item = ConnectOption>,
) -> Result<DatabaseHandle> {
    let params = ConnectionParams::new(kind).apply(options);
    open_with(&params, OpenSettings::default()).await
}

/// Open a handle from fully assembled parameters.
///
/// # Errors
///
/// Returns an error when required parameters are missing or the connection
/// cannot be established.
pub async fn open_with(params: &ConnectionParams, settings: OpenSettings) -> Result<DatabaseHandle> {
    let kind = params.kind();
    let connect_failed = |source| DataError::ConnectFailed { kind, source };

    let handle = match kind {
        BackendKind::Postgres => {
            let options = postgres_options(params)?
                .log_statements(settings.statement_level)
                .log_slow_statements(settings.slow_query_level, settings.slow_query_threshold);
            DatabaseHandle::Postgres(PgPool::connect_with(options).await.map_err(connect_failed)?)
        }
        BackendKind::MySql => {
            let options = mysql_options(params)?
                .log_statements(settings.statement_level)
                .log_slow_statements(settings.slow_query_level, settings.slow_query_threshold);
            DatabaseHandle::MySql(MySqlPool::connect_with(options).await.map_err(connect_failed)?)
        }
        BackendKind::Sqlite => {
            let options = sqlite_options(params)?
                .log_statements(settings.statement_level)
                .log_slow_statements(settings.slow_query_level, settings.slow_query_threshold);
            DatabaseHandle::Sqlite(SqlitePool::connect_with(options).await.map_err(connect_failed)?)
        }
    };

    info!(
        backend = %kind,
        host = params.host().unwrap_or_default(),
        port = params.port(),
        database = params.name().unwrap_or_default(),
        "database handle opened"
    );
    Ok(handle)
}

fn map_query_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DataError {
    move |source| DataError::QueryFailed { operation, source }
}

fn parse_options<O>(params: &ConnectionParams) -> Result<O>
where
    O: FromStr<Err = sqlx::Error>,
{
    let kind = params.kind();
    O::from_str(&params.connection_string()?)
        .map_err(|source| DataError::InvalidOptions { kind, source })
}

fn postgres_options(params: &ConnectionParams) -> Result<PgConnectOptions> {
    parse_options(params)
}

fn mysql_options(params: &ConnectionParams) -> Result<MySqlConnectOptions> {
    parse_options(params)
}

fn sqlite_options(params: &ConnectionParams) -> Result<SqliteConnectOptions> {
    parse_options::<SqliteConnectOptions>(params).map(|options| options.create_if_missing(true))
}

impl DatabaseHandle {
    /// Backend behind this handle.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Postgres(_) => BackendKind::Postgres,
            Self::MySql(_) => BackendKind::MySql,
            Self::Sqlite(_) => BackendKind::Sqlite,
        }
    }

    /// The `PostgreSQL` pool, when this is a Postgres handle.
    #[must_use]
    pub const fn as_postgres(&self) -> Option<&PgPool> {
        match self {
            Self::Postgres(pool) => Some(pool),
            _ => None,
        }
    }

    /// The `MySQL` pool, when this is a `MySQL` handle.
    #[must_use]
    pub const fn as_mysql(&self) -> Option<&MySqlPool> {
        match self {
            Self::MySql(pool) => Some(pool),
            _ => None,
        }
    }

    /// The `SQLite` pool, when this is a `SQLite` handle.
    #[must_use]
    pub const fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self {
            Self::Sqlite(pool) => Some(pool),
            _ => None,
        }
    }

    /// Round-trip a trivial statement to confirm the connection is usable.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement cannot be executed.
    pub async fn ping(&self) -> Result<()> {
        match self {
            Self::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Self::MySql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Self::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        }
        .map_err(map_query_err("ping"))
    }

    /// Run `migrator` against this handle.
    ///
    /// Foreign-key enforcement is switched off for the migration session unless
    /// `settings.foreign_keys_during_migration` is set. Postgres offers no
    /// unprivileged session switch, so its migrations always run as written.
    ///
    /// # Errors
    ///
    /// Returns an error when a connection cannot be acquired, the enforcement
    /// toggle fails, or a migration fails.
    pub async fn migrate(&self, migrator: &Migrator, settings: OpenSettings) -> Result<()> {
        let relax = !settings.foreign_keys_during_migration;

        match self {
            Self::Postgres(pool) => {
                debug!(
                    relax_requested = relax,
                    "postgres migrations run with foreign keys enforced"
                );
                let mut conn = pool.acquire().await.map_err(map_query_err("migrate.acquire"))?;
                migrator
                    .run_direct(&mut *conn)
                    .await
                    .map_err(|source| DataError::MigrationFailed { source })?;
            }
            Self::MySql(pool) => {
                let mut conn = pool.acquire().await.map_err(map_query_err("migrate.acquire"))?;
                if relax {
                    sqlx::query("SET FOREIGN_KEY_CHECKS = 0")
                        .execute(&mut *conn)
                        .await
                        .map_err(map_query_err("migrate.disable_foreign_keys"))?;
                }
                let outcome = migrator.run_direct(&mut *conn).await;
                if relax {
                    sqlx::query("SET FOREIGN_KEY_CHECKS = 1")
                        .execute(&mut *conn)
                        .await
                        .map_err(map_query_err("migrate.enable_foreign_keys"))?;
                }
                outcome.map_err(|source| DataError::MigrationFailed { source })?;
            }
            Self::Sqlite(pool) => {
                let mut conn = pool.acquire().await.map_err(map_query_err("migrate.acquire"))?;
                if relax {
                    sqlx::query("PRAGMA foreign_keys = OFF")
                        .execute(&mut *conn)
                        .await
                        .map_err(map_query_err("migrate.disable_foreign_keys"))?;
                }
                let outcome = migrator.run_direct(&mut *conn).await;
                if relax {
                    sqlx::query("PRAGMA foreign_keys = ON")
                        .execute(&mut *conn)
                        .await
                        .map_err(map_query_err("migrate.enable_foreign_keys"))?;
                }
                outcome.map_err(|source| DataError::MigrationFailed { source })?;
            }
        }

        info!(backend = %self.kind(), "database migrations applied");
        Ok(())
    }

    /// Close every pooled connection, waiting for checked-out ones to return.
    pub async fn close(&self) {
        match self {
            Self::Postgres(pool) => pool.close().await,
            Self::MySql(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
        info!(backend = %self.kind(), "database handle closed");
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Postgres(pool) => pool.is_closed(),
            Self::MySql(pool) => pool.is_closed(),
            Self::Sqlite(pool) => pool.is_closed(),
        }
    }
}
