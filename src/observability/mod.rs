//! Observability: structured logging via `tracing`.
//!
//! Logs go to stderr so that stdout carries only rotation results, or are
//! appended to a file when one is configured.

mod logging;

pub use logging::{LOG_FILTER_ENV, LogFormat, LoggingConfig};

use crate::config::LoggingSettings;
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Options for initialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    /// Whether verbose output was requested via CLI.
    pub verbose: bool,
}

/// Initializes logging from config settings with env overrides.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file cannot be opened.
pub fn init_from_config(settings: &LoggingSettings, options: InitOptions) -> Result<()> {
    init(LoggingConfig::from_settings(Some(settings), options.verbose))
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file cannot be opened.
pub fn init(config: LoggingConfig) -> Result<()> {
    match (&config.file, config.format) {
        (Some(log_file), LogFormat::Json) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(|e| subscriber_error(&e))?;
        },
        (Some(log_file), LogFormat::Pretty) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(|e| subscriber_error(&e))?;
        },
        (None, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(|e| subscriber_error(&e))?;
        },
        (None, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(|e| subscriber_error(&e))?;
        },
    }

    Ok(())
}

/// Opens `path` for appending, creating missing parent directories.
///
/// `tracing-subscriber` writes through a `Mutex<File>` directly.
fn open_log_file(path: &Path) -> Result<Mutex<File>> {
    let failed = |operation: &str, e: &io::Error| Error::OperationFailed {
        operation: operation.to_string(),
        cause: format!("{}: {e}", path.display()),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| failed("create_log_dir", &e))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(Mutex::new)
        .map_err(|e| failed("open_log_file", &e))
}

fn subscriber_error(e: &tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "install_subscriber".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_log_file_appends() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("log2rotate.log");
        std::fs::write(&path, "first\n").expect("seed log");

        let mut file = open_log_file(&path)
            .expect("log file opens")
            .into_inner()
            .expect("lock not poisoned");
        file.write_all(b"second\n").expect("write succeeds");
        drop(file);

        let contents = std::fs::read_to_string(&path).expect("log file readable");
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("log2rotate.log");

        let mut file = open_log_file(&path)
            .expect("log file opens")
            .into_inner()
            .expect("lock not poisoned");
        file.write_all(b"hello\n").expect("write succeeds");
        drop(file);

        let contents = std::fs::read_to_string(&path).expect("log file readable");
        assert_eq!(contents, "hello\n");
    }
}
