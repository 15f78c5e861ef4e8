//! Logger construction and installation.
//!
//! # Design
//! - One fmt layer formats each event once; the line is teed to the rotating
//!   file and the console so both targets always see the same output.
//! - Building and installing are separate steps so a logger can be used in a
//!   scope without touching the process-wide default.

use std::fmt::Display;
use std::io;
use std::path::Path;

use tracing::{Dispatch, error, info};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::fmt::{self, MakeWriter, time::ChronoLocal};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LogLevel, LoggerConfig};
use crate::error::{Result, TelemetryError};
use crate::rotate::RotatingFile;

/// A configured logger writing to a rotating file and the console.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    file: RotatingFile,
    config: LoggerConfig,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Logger")
            .field("path", &self.config.path)
            .field("level", &self.config.level)
            .finish_non_exhaustive()
    }
}

/// Build a logger for `path` at `level` with default rotation and install it globally.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global subscriber is
/// already installed.
pub fn new_logger(path: impl AsRef<Path>, level: LogLevel) -> Result<Logger> {
    let logger = Logger::build(&LoggerConfig::new(path.as_ref(), level))?;
    logger.install()?;
    Ok(logger)
}

impl Logger {
    /// Build a logger that mirrors output to standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened or the level filter is invalid.
    pub fn build(config: &LoggerConfig) -> Result<Self> {
        Self::build_with_console(config, BoxMakeWriter::new(io::stdout))
    }

    /// Build a logger that mirrors output to `console` instead of standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened or the level filter is invalid.
    pub fn build_with_console<W>(config: &LoggerConfig, console: W) -> Result<Self>
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let file = RotatingFile::open(&config.path, config.rotation)?;
        let dispatch = build_dispatch(config, file.clone().and(console))?;

        let logger = Self {
            dispatch,
            file,
            config: config.clone(),
        };
        logger.in_scope(|| info!(path = %config.path.display(), "Logger is ready."));
        Ok(logger)
    }

    /// Install this logger as the process-wide default, bridging `log` records too.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber has already been installed.
    pub fn install(&self) -> Result<()> {
        self.dispatch
            .clone()
            .try_init()
            .map_err(|source| TelemetryError::SubscriberInstall { source })
    }

    /// Run `scope` with this logger as the thread's default.
    pub fn in_scope<T>(&self, scope: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, scope)
    }

    /// Underlying dispatcher.
    #[must_use]
    pub const fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Rotating file sink behind this logger.
    #[must_use]
    pub const fn file(&self) -> &RotatingFile {
        &self.file
    }

    /// Configuration the logger was built from.
    #[must_use]
    pub const fn config(&self) -> &LoggerConfig {
        &self.config
    }
}

fn build_dispatch<W>(config: &LoggerConfig, writer: W) -> Result<Dispatch>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(config.level.as_str())
        .map_err(|source| TelemetryError::InvalidFilter { source })?;
    let timer = ChronoLocal::new(config.timestamp_format.clone());

    let dispatch = match config.format {
        LogFormat::Text => Dispatch::new(
            tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .with_writer(writer)
                    .with_timer(timer)
                    .with_ansi(config.ansi)
                    .with_target(false)
                    .with_thread_ids(false),
            ),
        ),
        LogFormat::Json => Dispatch::new(
            tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_timer(timer)
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_ids(false),
            ),
        ),
    };
    Ok(dispatch)
}

/// Log `message` at error level and terminate the process with status 1.
pub fn fatal(message: impl Display) -> ! {
    error!(fatal = true, "{message}");
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::TempDir;
    use tracing::{debug, warn};

    use super::*;
    use crate::config::RotationPolicy;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("capture lock")).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn single_event_reaches_file_and_console() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("app.log");
        let console = Captured::default();
        let config = LoggerConfig::new(&path, LogLevel::Info).with_ansi(false);

        let logger = Logger::build_with_console(&config, console.clone())?;
        logger.in_scope(|| info!(order = 7, "order shipped"));

        let file_output = std::fs::read_to_string(&path)?;
        let console_output = console.contents();
        assert_eq!(file_output, console_output);
        assert!(file_output.contains("Logger is ready."));
        assert!(file_output.contains("order shipped"));
        assert!(file_output.contains("order=7"));
        Ok(())
    }

    #[test]
    fn level_threshold_filters_events() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("app.log");
        let console = Captured::default();
        let config = LoggerConfig::new(&path, LogLevel::Warn).with_ansi(false);

        let logger = Logger::build_with_console(&config, console.clone())?;
        logger.in_scope(|| {
            debug!("hidden debug");
            info!("hidden info");
            warn!("visible warning");
        });

        let output = console.contents();
        assert!(!output.contains("hidden"));
        assert!(!output.contains("Logger is ready."));
        assert!(output.contains("visible warning"));
        Ok(())
    }

    #[test]
    fn timestamps_use_configured_layout() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let console = Captured::default();
        let config = LoggerConfig::new(dir.path().join("app.log"), LogLevel::Info)
            .with_ansi(false)
            .with_timestamp_format("[%Y]");

        let logger = Logger::build_with_console(&config, console.clone())?;
        logger.in_scope(|| info!("stamped"));

        let year = chrono::Local::now().format("[%Y]").to_string();
        let line = console
            .contents()
            .lines()
            .find(|line| line.contains("stamped"))
            .map(str::to_owned)
            .unwrap_or_default();
        assert!(line.starts_with(&year), "unexpected line: {line}");
        Ok(())
    }

    #[test]
    fn forced_colors_emit_ansi_codes() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let console = Captured::default();
        let config = LoggerConfig::new(dir.path().join("app.log"), LogLevel::Info);

        let logger = Logger::build_with_console(&config, console.clone())?;
        logger.in_scope(|| info!("colorful"));

        assert!(console.contents().contains("\u{1b}["));
        Ok(())
    }

    #[test]
    fn json_format_emits_structured_lines() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let console = Captured::default();
        let config = LoggerConfig::new(dir.path().join("app.log"), LogLevel::Info)
            .with_format(LogFormat::Json);

        let logger = Logger::build_with_console(&config, console.clone())?;
        logger.in_scope(|| info!(user = "ada", "signed in"));

        let output = console.contents();
        let line = output
            .lines()
            .find(|line| line.contains("signed in"))
            .ok_or_else(|| anyhow::anyhow!("missing json line in {output}"))?;
        let value: serde_json::Value = serde_json::from_str(line)?;
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["fields"]["message"], "signed in");
        assert_eq!(value["fields"]["user"], "ada");
        Ok(())
    }

    #[test]
    fn rotation_applies_through_logger() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = LoggerConfig::new(dir.path().join("app.log"), LogLevel::Info)
            .with_ansi(false)
            .with_rotation(RotationPolicy {
                max_size: 128,
                max_backups: 3,
                max_age: std::time::Duration::ZERO,
                compress: false,
            });

        let logger = Logger::build_with_console(&config, io::sink)?;
        logger.in_scope(|| {
            for index in 0..20 {
                info!(index, "filling the log file with enough text to rotate");
            }
        });

        let backups = logger.file().backups()?;
        assert!(!backups.is_empty());
        assert!(backups.len() <= 3);
        Ok(())
    }
}
