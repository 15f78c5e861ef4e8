//! Logger configuration: verbosity, output format, and rotation thresholds.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;

use crate::error::{Result, TelemetryError};

/// Timestamp layout used for every log line.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MEGABYTE: u64 = 1024 * 1024;
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Verbosity threshold for emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Everything, including per-statement traces.
    Trace,
    /// Diagnostic detail.
    Debug,
    /// Normal operational messages.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Lowercase name, usable as a filter directive.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = TelemetryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "fatal" | "panic" => Ok(Self::Error),
            _ => Err(TelemetryError::InvalidLevel {
                value: value.to_string(),
            }),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        Self::from_level(level.into())
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line text.
    #[default]
    Text,
    /// Emit logs as structured JSON objects.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(TelemetryError::InvalidFormat {
                value: value.to_string(),
            }),
        }
    }
}

/// Size, count, and age bounds for the rotating log file.
///
/// A zero `max_size`, `max_backups`, or `max_age` disables that bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate once the active file would grow past this many bytes.
    pub max_size: u64,
    /// Rotated files to keep.
    pub max_backups: usize,
    /// Rotated files older than this are removed.
    pub max_age: Duration,
    /// Gzip rotated files.
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: 30 * MEGABYTE,
            max_backups: 10,
            max_age: DAY * 30,
            compress: true,
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Active log file path.
    pub path: PathBuf,
    /// Verbosity threshold.
    pub level: LogLevel,
    /// Rotation thresholds for the file sink.
    pub rotation: RotationPolicy,
    /// `chrono` strftime layout for timestamps.
    pub timestamp_format: String,
    /// Emit ANSI color codes regardless of the destination.
    pub ansi: bool,
    /// Output format.
    pub format: LogFormat,
}

impl LoggerConfig {
    /// Configuration for `path` at `level`, with fixed rotation and formatting defaults.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, level: LogLevel) -> Self {
        Self {
            path: path.into(),
            level,
            rotation: RotationPolicy::default(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            ansi: true,
            format: LogFormat::Text,
        }
    }

    /// Replace the rotation thresholds.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    /// Replace the timestamp layout.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Toggle forced ANSI colors.
    #[must_use]
    pub const fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Select the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}
