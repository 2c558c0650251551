//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter directive.
pub const LOG_FILTER_ENV: &str = "LOG2ROTATE_LOG";

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output (default).
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        })
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// The filter is taken from `LOG2ROTATE_LOG`, then the configured level,
    /// then `debug` when `verbose` is set, else `warn`. An unparseable
    /// directive falls back to the default.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let directive = std::env::var(LOG_FILTER_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| settings.and_then(|s| s.level.clone()))
            .unwrap_or_else(|| {
                if verbose {
                    VERBOSE_FILTER.to_string()
                } else {
                    DEFAULT_FILTER.to_string()
                }
            });

        let filter =
            EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let format = settings
            .and_then(|s| s.format.as_deref())
            .map_or(LogFormat::Pretty, |f| {
                f.parse().unwrap_or(LogFormat::Pretty)
            });
        let file = settings.and_then(|s| s.file.clone());

        Self {
            filter,
            format,
            file,
        }
    }
}
