//! Environment-driven application configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bootkit_data::{BackendKind, ConnectOption, ConnectionParams};
use bootkit_http::{DEFAULT_HOST, DEFAULT_PORT};
use bootkit_telemetry::{LogFormat, LogLevel, LoggerConfig};

use crate::error::{AppError, AppResult};

const DEFAULT_LOG_PATH: &str = "logs/bootkit.log";
const DEFAULT_SHUTDOWN_SECS: u64 = 5;

/// Fully resolved settings for one application run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection parameters.
    pub database: ConnectionParams,
    /// Directory of SQL migrations applied at startup.
    pub migrations_dir: Option<PathBuf>,
    /// HTTP bind host.
    pub http_host: String,
    /// HTTP bind port.
    pub http_port: u16,
    /// Logger settings.
    pub log: LoggerConfig,
    /// Upper bound on graceful HTTP shutdown.
    pub shutdown_deadline: Duration,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let var = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let kind_raw = var("BOOTKIT_DB_KIND").ok_or(AppError::MissingEnv {
            name: "BOOTKIT_DB_KIND",
        })?;
        let kind = BackendKind::from_str(&kind_raw)
            .map_err(|err| AppError::data("config.db_kind", err))?;

        let mut options = Vec::new();
        if let Some(path) = var("BOOTKIT_DB_PATH") {
            options.push(ConnectOption::Path(PathBuf::from(path)));
        }
        if let Some(host) = var("BOOTKIT_DB_HOST") {
            options.push(ConnectOption::Host(host));
        }
        if let Some(port) = var("BOOTKIT_DB_PORT") {
            options.push(ConnectOption::Port(parse_port("BOOTKIT_DB_PORT", port)?));
        }
        if let Some(name) = var("BOOTKIT_DB_NAME") {
            options.push(ConnectOption::Name(name));
        }
        if let Some(user) = var("BOOTKIT_DB_USER") {
            options.push(ConnectOption::User(user));
        }
        if let Some(password) = lookup("BOOTKIT_DB_PASSWORD") {
            options.push(ConnectOption::Password(password));
        }

        let http_port = var("BOOTKIT_HTTP_PORT")
            .map(|port| parse_port("BOOTKIT_HTTP_PORT", port))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let level = var("BOOTKIT_LOG_LEVEL")
            .map(|value| LogLevel::from_str(&value))
            .transpose()
            .map_err(|err| AppError::telemetry("config.log_level", err))?
            .unwrap_or_default();
        let format = var("BOOTKIT_LOG_FORMAT")
            .map(|value| LogFormat::from_str(&value))
            .transpose()
            .map_err(|err| AppError::telemetry("config.log_format", err))?
            .unwrap_or_default();
        let log_path = var("BOOTKIT_LOG_PATH").unwrap_or_else(|| DEFAULT_LOG_PATH.to_string());

        let shutdown_secs = match var("BOOTKIT_SHUTDOWN_SECS") {
            Some(value) => value.parse::<u64>().map_err(|_| AppError::InvalidConfig {
                field: "BOOTKIT_SHUTDOWN_SECS",
                reason: "not a whole number of seconds",
                value: Some(value),
            })?,
            None => DEFAULT_SHUTDOWN_SECS,
        };

        Ok(Self {
            database: ConnectionParams::new(kind).apply(options),
            migrations_dir: var("BOOTKIT_MIGRATIONS_DIR").map(PathBuf::from),
            http_host: var("BOOTKIT_HTTP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            http_port,
            log: LoggerConfig::new(log_path, level).with_format(format),
            shutdown_deadline: Duration::from_secs(shutdown_secs),
        })
    }
}

fn parse_port(field: &'static str, value: String) -> AppResult<u16> {
    value.parse::<u16>().map_err(|_| AppError::InvalidConfig {
        field,
        reason: "not a valid port",
        value: Some(value),
    })
}
