//! # Logging Utilities
//!
//! Logging infrastructure for symsrc using `tracing`.
//!
//! The locator itself only emits `tracing` events; whichever program embeds
//! it decides where those events go by calling one of the initializers here:
//! - Pretty console output for development, JSON for pipelines
//! - `RUST_LOG` style filtering
//! - An optional log file (written through a non-blocking appender)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symsrc_utils::init_logging;
//!
//! // Reads RUST_LOG, SYMSRC_LOG_FORMAT and SYMSRC_LOG_FILE
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("batch started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=symsrc_core=debug`)
//! - `SYMSRC_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `SYMSRC_LOG_FILE`: Optional path to a log file (or a directory for a dated file)
//!
//! ## Settings
//!
//! The same knobs are available as [`LogSettings`], which is what the
//! `logging` section of a locator configuration file deserializes into:
//!
//! ```rust,no_run
//! use symsrc_utils::{LogFormat, LogLevel, LogSettings, init_logging_from};
//!
//! let settings = LogSettings {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Json,
//!     ..LogSettings::default()
//! };
//! init_logging_from(&settings).expect("Failed to initialize logging");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self as tracing_fmt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default for development)
    #[default]
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    #[default]
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", Level::from(*self))
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Logging configuration as it appears in a locator config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings
{
    /// Default level when `RUST_LOG` is not set.
    pub level: LogLevel,
    /// Console/file output format.
    pub format: LogFormat,
    /// Log file path. A directory gets a dated `YYYY-MM-DD-symsrc.log` inside it.
    pub file: Option<PathBuf>,
    /// Whether to also log to stdout when a file is configured.
    pub console: bool,
}

impl Default for LogSettings
{
    fn default() -> Self
    {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            file: None,
            console: true,
        }
    }
}

impl LogSettings
{
    /// Build settings from `SYMSRC_LOG_FORMAT` and `SYMSRC_LOG_FILE`.
    ///
    /// Unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self
    {
        let format = env::var("SYMSRC_LOG_FORMAT")
            .ok()
            .and_then(|s| LogFormat::from_str(&s).ok())
            .unwrap_or_default();

        let level = env::var("RUST_LOG")
            .ok()
            .and_then(|s| LogLevel::from_str(&s).ok())
            .unwrap_or_default();

        Self {
            level,
            format,
            file: env::var("SYMSRC_LOG_FILE").ok().map(PathBuf::from),
            console: true,
        }
    }

    /// Resolve the configured file path, expanding a directory into a dated file name.
    #[must_use]
    pub fn resolved_file(&self) -> Option<PathBuf>
    {
        let file = self.file.as_ref()?;
        if file.is_dir() {
            let today = Utc::now().format("%Y-%m-%d");
            Some(file.join(format!("{today}-symsrc.log")))
        } else {
            Some(file.clone())
        }
    }
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `symsrc_core=debug`)
/// - `SYMSRC_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `SYMSRC_LOG_FILE`: Optional path to log file
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file directory cannot be created.
pub fn init_logging() -> Result<(), LoggingError>
{
    init_logging_from(&LogSettings::from_env())
}

/// Initialize logging with explicit level and format (console only)
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    init_logging_from(&LogSettings {
        level,
        format,
        file: None,
        console: true,
    })
}

/// Initialize logging from a [`LogSettings`] value.
///
/// `RUST_LOG` still wins over `settings.level` when it is set, so module
/// specific filters such as `symsrc_core::session=trace` keep working.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file directory cannot be created.
pub fn init_logging_from(settings: &LogSettings) -> Result<(), LoggingError>
{
    let level: Level = settings.level.into();
    // RUST_LOG can override the default level with more specific filters
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let log_file = settings.resolved_file();
    if let Some(parent) = log_file.as_deref().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let console_layer = settings.console.then(|| match settings.format {
        LogFormat::Pretty => tracing_fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stdout)
            .with_filter(env_filter())
            .boxed(),
        LogFormat::Json => tracing_fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stdout)
            .with_filter(env_filter())
            .boxed(),
    });

    let file_layer = log_file.map(|file_path| {
        // Use rolling::never() since a directory target already carries the date
        let file_appender = tracing_appender::rolling::never(
            file_path.parent().unwrap_or_else(|| Path::new(".")),
            file_path.file_name().unwrap_or_default(),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The guard flushes on drop; logging lives for the rest of the process
        std::mem::forget(guard);

        match settings.format {
            LogFormat::Pretty => tracing_fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false) // No ANSI in files
                .with_filter(env_filter())
                .boxed(),
            LogFormat::Json => tracing_fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_current_span(true)
                .with_span_list(true)
                .with_filter(env_filter())
                .boxed(),
        }
    });

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("dev").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("PROD").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert_eq!(LogLevel::Debug.to_string(), "DEBUG");
    }

    #[test]
    fn test_settings_deserialize_with_defaults()
    {
        let settings: LogSettings = serde_json::from_str(r#"{ "format": "json" }"#).unwrap();
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.level, LogLevel::Info);
        assert!(settings.console);
        assert!(settings.file.is_none());
    }

    #[test]
    fn test_resolved_file_for_directory_is_dated()
    {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings {
            file: Some(dir.path().to_path_buf()),
            ..LogSettings::default()
        };

        let resolved = settings.resolved_file().unwrap();
        assert_eq!(resolved.parent().unwrap(), dir.path());
        let name = resolved.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-symsrc.log"));
    }

    #[test]
    fn test_resolved_file_keeps_explicit_path()
    {
        let settings = LogSettings {
            file: Some(PathBuf::from("/tmp/does-not-exist/run.log")),
            ..LogSettings::default()
        };
        assert_eq!(settings.resolved_file(), Some(PathBuf::from("/tmp/does-not-exist/run.log")));
    }
}
