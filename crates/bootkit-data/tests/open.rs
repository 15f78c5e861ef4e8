use std::path::Path;

use anyhow::{Context, Result};
use bootkit_data::{
    BackendKind, ConnectOption, ConnectionParams, DataError, OpenSettings, open, open_with,
};
use sqlx::migrate::Migrator;
use tempfile::TempDir;

const SCHEMA_MIGRATION: &str = r"
CREATE TABLE owners (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE pets (
    id INTEGER PRIMARY KEY,
    owner_id INTEGER NOT NULL REFERENCES owners(id),
    name TEXT NOT NULL
);
";

const ORPHAN_MIGRATION: &str = r"
INSERT INTO pets (id, owner_id, name) VALUES (1, 42, 'stray');
";

fn write_migrations(dir: &Path) -> Result<()> {
    std::fs::write(dir.join("0001_schema.sql"), SCHEMA_MIGRATION)?;
    std::fs::write(dir.join("0002_orphan.sql"), ORPHAN_MIGRATION)?;
    Ok(())
}

#[tokio::test]
async fn sqlite_handle_opens_and_pings() -> Result<()> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("state.db");

    let handle = open(
        BackendKind::Sqlite,
        [ConnectOption::Path(db_path.clone())],
    )
    .await?;

    assert_eq!(handle.kind(), BackendKind::Sqlite);
    assert!(handle.as_sqlite().is_some());
    assert!(handle.as_postgres().is_none());
    handle.ping().await?;
    assert!(db_path.exists(), "sqlite file should be created on open");

    handle.close().await;
    assert!(handle.is_closed());
    Ok(())
}

#[tokio::test]
async fn sqlite_without_path_is_rejected_before_connecting() {
    let err = open(BackendKind::Sqlite, Vec::<ConnectOption>::new())
        .await
        .expect_err("path is required");
    assert!(matches!(
        err,
        DataError::MissingParameter {
            kind: BackendKind::Sqlite,
            field: "path"
        }
    ));
}

#[test]
fn unsupported_backend_selector_never_reaches_open() {
    let err = "mssql"
        .parse::<BackendKind>()
        .expect_err("mssql is not supported");
    assert_eq!(err.to_string(), "unsupported database backend: mssql");
}

fn assert_send<T: Send>(value: T) -> T {
    value
}

#[tokio::test]
async fn malformed_host_is_rejected_before_connecting() {
    let params = ConnectionParams::new(BackendKind::Postgres).with_host("db.internal:6000");
    let err = open_with(&params, OpenSettings::default())
        .await
        .expect_err("port belongs in its own option");
    assert!(matches!(
        err,
        DataError::InvalidConnectionString {
            kind: BackendKind::Postgres,
            ..
        }
    ));
}

#[tokio::test]
async fn migrations_run_with_foreign_keys_relaxed() -> Result<()> {
    let dir = TempDir::new()?;
    let migrations = dir.path().join("migrations");
    std::fs::create_dir_all(&migrations)?;
    write_migrations(&migrations)?;

    let params = ConnectionParams::new(BackendKind::Sqlite).with_path(dir.path().join("app.db"));
    let settings = OpenSettings::default();
    let handle = open_with(&params, settings).await?;
    let migrator = Migrator::new(migrations.as_path()).await?;

    assert_send(handle.migrate(&migrator, settings)).await?;

    let pool = handle.as_sqlite().context("expected sqlite pool")?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pets")
        .fetch_one(pool)
        .await?;
    assert_eq!(count, 1);

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn migrations_fail_when_foreign_keys_stay_enforced() -> Result<()> {
    let dir = TempDir::new()?;
    let migrations = dir.path().join("migrations");
    std::fs::create_dir_all(&migrations)?;
    write_migrations(&migrations)?;

    let params = ConnectionParams::new(BackendKind::Sqlite).with_path(dir.path().join("app.db"));
    let settings = OpenSettings {
        foreign_keys_during_migration: true,
        ..OpenSettings::default()
    };
    let handle = open_with(&params, settings).await?;
    let migrator = Migrator::new(migrations.as_path()).await?;

    let err = handle
        .migrate(&migrator, settings)
        .await
        .expect_err("orphan insert must violate the foreign key");
    assert!(matches!(err, DataError::MigrationFailed { .. }));

    handle.close().await;
    Ok(())
}

fn params_from_url(kind: BackendKind, var: &str, raw: &str) -> Result<ConnectionParams> {
    let url = url::Url::parse(raw).with_context(|| format!("{var} is not a url"))?;
    let mut options = vec![ConnectOption::Host(
        url.host_str().context("url has no host")?.to_string(),
    )];
    if let Some(port) = url.port() {
        options.push(ConnectOption::Port(port));
    }
    if !url.username().is_empty() {
        options.push(ConnectOption::User(url.username().to_string()));
    }
    if let Some(password) = url.password() {
        options.push(ConnectOption::Password(password.to_string()));
    }
    let name = url.path().trim_start_matches('/');
    if !name.is_empty() {
        options.push(ConnectOption::Name(name.to_string()));
    }
    Ok(ConnectionParams::new(kind).apply(options))
}

async fn ping_network_backend(kind: BackendKind, var: &str) -> Result<()> {
    let Ok(raw) = std::env::var(var) else {
        eprintln!("skipping {kind} connectivity test: {var} not set");
        return Ok(());
    };
    let params = params_from_url(kind, var, &raw)?;
    let handle = open_with(&params, OpenSettings::default()).await?;
    assert_eq!(handle.kind(), kind);
    handle.ping().await?;
    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn postgres_handle_pings_when_configured() -> Result<()> {
    ping_network_backend(BackendKind::Postgres, "BOOTKIT_TEST_POSTGRES_URL").await
}

#[tokio::test]
async fn mysql_handle_pings_when_configured() -> Result<()> {
    ping_network_backend(BackendKind::MySql, "BOOTKIT_TEST_MYSQL_URL").await
}
