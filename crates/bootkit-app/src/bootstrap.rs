//! Application boot sequence: logger, database, HTTP server, signal-driven shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use bootkit_data::{DatabaseHandle, OpenSettings, open_with};
use bootkit_http::HttpServer;
use bootkit_telemetry::{Logger, fatal};
use serde_json::json;
use sqlx::migrate::Migrator;
use tokio::signal;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Entry point for the bootkit boot sequence.
///
/// Installs the global logger, then runs until Ctrl+C or SIGTERM. Failures
/// after the logger is live terminate the process through [`fatal`].
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or the logger cannot be
/// installed.
pub async fn run_app() -> AppResult<()> {
    let config = AppConfig::from_env()?;
    let logger = Logger::build(&config.log).map_err(|err| AppError::telemetry("logger.build", err))?;
    logger
        .install()
        .map_err(|err| AppError::telemetry("logger.install", err))?;

    if let Err(err) = run_app_with(&config, shutdown_signal()).await {
        fatal(err.chain());
    }
    Ok(())
}

/// Boot sequence that serves until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated, or the
/// server cannot bind.
pub async fn run_app_with(
    config: &AppConfig,
    shutdown: impl Future<Output = ()> + Send,
) -> AppResult<()> {
    let mut app = start_app(config).await?;
    shutdown.await;
    app.shutdown().await;
    Ok(())
}

/// Services started by [`start_app`].
#[derive(Debug)]
pub struct RunningApp {
    server: HttpServer,
    database: DatabaseHandle,
    addr: SocketAddr,
    shutdown_deadline: Duration,
}

impl RunningApp {
    /// Address the HTTP server is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Database handle shared with request handlers.
    #[must_use]
    pub const fn database(&self) -> &DatabaseHandle {
        &self.database
    }

    /// Stop the server within the configured deadline, then close the database.
    pub async fn shutdown(&mut self) {
        self.server.stop(self.shutdown_deadline).await;
        self.database.close().await;
        info!("bootkit shutdown complete");
    }
}

/// Open the database, apply migrations, and start serving.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated, or the
/// server cannot bind.
pub async fn start_app(config: &AppConfig) -> AppResult<RunningApp> {
    info!(backend = %config.database.kind(), "bootkit starting");
    let settings = OpenSettings::default();
    let database = open_with(&config.database, settings)
        .await
        .map_err(|err| AppError::data("database.open", err))?;

    if let Some(dir) = &config.migrations_dir {
        let migrator = Migrator::new(dir.as_path())
            .await
            .map_err(|err| AppError::migrations("migrations.load", err))?;
        database
            .migrate(&migrator, settings)
            .await
            .map_err(|err| AppError::data("database.migrate", err))?;
    }

    let mut server = HttpServer::new(router(database.clone()))
        .with_host(config.http_host.clone())
        .with_port(config.http_port);
    let addr = server
        .start()
        .map_err(|err| AppError::http("server.start", err))?;

    Ok(RunningApp {
        server,
        database,
        addr,
        shutdown_deadline: config.shutdown_deadline,
    })
}

fn router(database: DatabaseHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(database)
}

async fn health(State(database): State<DatabaseHandle>) -> impl IntoResponse {
    let backend = database.kind().as_str();
    match database.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": backend })),
        ),
        Err(err) => {
            warn!(error = %err, "health check failed to reach database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "database": backend })),
            )
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => warn!("received Ctrl+C, shutting down"),
        () = terminate => warn!("received terminate signal, shutting down"),
    }
}
