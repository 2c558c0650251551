//! Configuration management.
//!
//! Configuration comes from an optional TOML file; command-line flags
//! override it. A file looks like:
//!
//! ```toml
//! [rotation]
//! format = "backup-%Y-%m-%d.tar.zst"
//! unit = "days"
//! skip = 7
//! fuzz = 1
//! unsafe = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! file = "/var/log/log2rotate.log"
//! ```

use crate::rotation::{AgeUnit, DEFAULT_FORMAT, RotationPolicy, TimestampFormat};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file to load.
pub const CONFIG_PATH_ENV: &str = "LOG2ROTATE_CONFIG_PATH";

/// Candidate config file paths, most specific first.
fn default_locations() -> Vec<PathBuf> {
    let Some(base_dirs) = directories::BaseDirs::new() else {
        return Vec::new();
    };

    let platform = base_dirs.config_dir().join("log2rotate").join("config.toml");
    let xdg = base_dirs
        .home_dir()
        .join(".config")
        .join("log2rotate")
        .join("config.toml");

    if platform == xdg {
        vec![platform]
    } else {
        vec![platform, xdg]
    }
}

/// Main configuration for log2rotate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log2RotateConfig {
    /// Rotation settings.
    pub rotation: RotationSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Rotation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSettings {
    /// `strftime` pattern for backup names.
    pub format: String,
    /// Unit of age distance.
    pub unit: AgeUnit,
    /// Number of newest backups always kept.
    pub skip: usize,
    /// Fuzz window in age units.
    pub fuzz: u64,
    /// Tolerate missing backups.
    pub unsafe_mode: bool,
    /// Treat names as plain integers instead of dates.
    pub numeric: bool,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            unit: AgeUnit::default(),
            skip: 0,
            fuzz: 0,
            unsafe_mode: false,
            numeric: false,
        }
    }
}

impl RotationSettings {
    /// Builds the rotation policy.
    #[must_use]
    pub const fn policy(&self) -> RotationPolicy {
        RotationPolicy::new()
            .with_skip(self.skip)
            .with_fuzz(self.fuzz)
            .with_unsafe(self.unsafe_mode)
    }

    /// Builds the timestamp format.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid.
    pub fn timestamp_format(&self) -> Result<TimestampFormat> {
        Ok(TimestampFormat::new(self.format.clone())?.with_unit(self.unit))
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log filter directive, e.g. `info` or `log2rotate=debug`.
    pub level: Option<String>,
    /// Log format: `pretty` or `json`.
    pub format: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Rotation section.
    pub rotation: Option<ConfigFileRotation>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Rotation section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRotation {
    /// Identifier format.
    pub format: Option<String>,
    /// Age unit.
    pub unit: Option<AgeUnit>,
    /// Skip count.
    pub skip: Option<usize>,
    /// Fuzz window.
    pub fuzz: Option<u64>,
    /// Unsafe mode.
    #[serde(rename = "unsafe")]
    pub unsafe_mode: Option<bool>,
    /// Numeric identifiers.
    pub numeric: Option<bool>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// Output format.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Log2RotateConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from an explicit path, the `LOG2ROTATE_CONFIG_PATH`
    /// environment variable, or the default location, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path);
        }

        if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
            if !config_path.trim().is_empty() {
                return Self::load_from_file(Path::new(&config_path));
            }
        }

        Self::load_default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the first default location that exists.
    ///
    /// Candidates, in order: the platform config dir
    /// (`~/Library/Application Support/log2rotate/` on macOS), then
    /// `~/.config/log2rotate/`. Returns defaults when neither holds a
    /// `config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file found cannot be read or parsed. A broken
    /// file is never replaced by defaults.
    pub fn load_default() -> Result<Self> {
        Self::load_first_existing(&default_locations())
    }

    /// Loads the first path in `candidates` that exists, or defaults.
    fn load_first_existing(candidates: &[PathBuf]) -> Result<Self> {
        candidates
            .iter()
            .find(|path| path.is_file())
            .map_or_else(|| Ok(Self::default()), |path| Self::load_from_file(path))
    }

    /// Converts a `ConfigFile` to `Log2RotateConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(rotation) = file.rotation {
            if let Some(format) = rotation.format {
                config.rotation.format = format;
            }
            if let Some(unit) = rotation.unit {
                config.rotation.unit = unit;
            }
            if let Some(skip) = rotation.skip {
                config.rotation.skip = skip;
            }
            if let Some(fuzz) = rotation.fuzz {
                config.rotation.fuzz = fuzz;
            }
            if let Some(v) = rotation.unsafe_mode {
                config.rotation.unsafe_mode = v;
            }
            if let Some(v) = rotation.numeric {
                config.rotation.numeric = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.level = logging.level;
            config.logging.format = logging.format;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }
}
