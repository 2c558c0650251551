//! Binary entry point for log2rotate.
//!
//! Reads backup names from stdin and prints the ones to keep or delete.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{ArgGroup, Parser};
use log2rotate::cli::{OutputFormat, RotateCommand};
use log2rotate::config::{Log2RotateConfig, RotationSettings};
use log2rotate::observability::{self, InitOptions};
use log2rotate::{AgeUnit, Error, OutputMode};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Rotate backups using exponentially-growing periods.
#[derive(Parser)]
#[command(name = "log2rotate")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["keep", "delete"])))]
struct Cli {
    /// Show backups to delete.
    #[arg(short, long)]
    delete: bool,

    /// Show backups to keep.
    #[arg(short, long)]
    keep: bool,

    /// Make unsafe recommendations.
    #[arg(short, long = "unsafe", overrides_with = "no_unsafe")]
    unsafe_mode: bool,

    /// Refuse to answer when an expected backup is missing, even if the
    /// config file sets `unsafe = true`.
    #[arg(long = "no-unsafe", overrides_with = "unsafe_mode")]
    no_unsafe: bool,

    /// Always keep NUM latest backups.
    #[arg(short, long, value_name = "NUM", env = "LOG2ROTATE_SKIP")]
    skip: Option<usize>,

    /// Accept a backup up to NUM units older than the ideal one.
    #[arg(long, value_name = "NUM", env = "LOG2ROTATE_FUZZ")]
    fuzz: Option<u64>,

    /// Use FMT for parsing date from backup name.
    #[arg(short, long, value_name = "FMT", env = "LOG2ROTATE_FORMAT")]
    format: Option<String>,

    /// Unit of backup age: seconds, minutes, hours, days or weeks.
    #[arg(long, value_name = "UNIT")]
    unit: Option<AgeUnit>,

    /// Treat backup names as integers instead of dates.
    #[arg(long, overrides_with = "no_numeric")]
    numeric: bool,

    /// Treat backup names as dates, even if the config file sets
    /// `numeric = true`.
    #[arg(long = "no-numeric", overrides_with = "numeric")]
    no_numeric: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Lines)]
    output: OutputFormat,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    const fn mode(&self) -> OutputMode {
        if self.keep {
            OutputMode::Keep
        } else {
            OutputMode::Delete
        }
    }

    /// Layers command-line flags over the configured rotation settings.
    ///
    /// A `--no-*` switch clears a flag the config file enables.
    fn rotation_settings(&self, configured: RotationSettings) -> RotationSettings {
        RotationSettings {
            format: self.format.clone().unwrap_or(configured.format),
            unit: self.unit.unwrap_or(configured.unit),
            skip: self.skip.unwrap_or(configured.skip),
            fuzz: self.fuzz.unwrap_or(configured.fuzz),
            unsafe_mode: !self.no_unsafe && (self.unsafe_mode || configured.unsafe_mode),
            numeric: !self.no_numeric && (self.numeric || configured.numeric),
        }
    }
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Log2RotateConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_config(
        &config.logging,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        eprintln!("error: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::InconsistentRetentionState { .. }) => {
            error!(error = %e, "Rotation aborted");
            eprintln!(
                "error: backups that should have been kept are missing from the input list \
                 (use --unsafe to proceed anyway)"
            );
            ExitCode::FAILURE
        },
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the rotation over stdin.
fn run(cli: &Cli, config: Log2RotateConfig) -> log2rotate::Result<()> {
    let settings = cli.rotation_settings(config.rotation);
    let command = RotateCommand::new(settings, cli.mode()).with_output(cli.output);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();
    let decision = command.execute(stdin.lock(), &mut stdout.lock(), &mut stderr.lock())?;

    info!(summary = %decision.summary(), "Rotation completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mode_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["log2rotate"]).is_err());
        assert!(Cli::try_parse_from(["log2rotate", "--keep", "--delete"]).is_err());

        let cli = Cli::try_parse_from(["log2rotate", "-d"]).expect("delete mode parses");
        assert_eq!(cli.mode(), OutputMode::Delete);
        let cli = Cli::try_parse_from(["log2rotate", "-k"]).expect("keep mode parses");
        assert_eq!(cli.mode(), OutputMode::Keep);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "log2rotate",
            "--keep",
            "--unsafe",
            "--skip",
            "3",
            "--fuzz",
            "2",
            "--format",
            "%Y%m%d",
            "--unit",
            "hours",
        ])
        .expect("flags parse");

        let configured = RotationSettings {
            skip: 9,
            numeric: true,
            ..RotationSettings::default()
        };
        let settings = cli.rotation_settings(configured);

        assert_eq!(settings.skip, 3);
        assert_eq!(settings.fuzz, 2);
        assert_eq!(settings.format, "%Y%m%d");
        assert_eq!(settings.unit, AgeUnit::Hours);
        assert!(settings.unsafe_mode);
        assert!(settings.numeric);
    }

    #[test]
    fn test_unit_accepts_abbreviations() {
        let cli = Cli::try_parse_from(["log2rotate", "-k", "--unit", "H"]).expect("unit parses");
        assert_eq!(cli.unit, Some(AgeUnit::Hours));
        assert!(Cli::try_parse_from(["log2rotate", "-k", "--unit", "fortnights"]).is_err());
    }

    #[test]
    fn test_no_switches_clear_configured_flags() {
        let configured = RotationSettings {
            unsafe_mode: true,
            numeric: true,
            ..RotationSettings::default()
        };

        let cli = Cli::try_parse_from(["log2rotate", "-d", "--no-unsafe", "--no-numeric"])
            .expect("flags parse");
        let settings = cli.rotation_settings(configured.clone());
        assert!(!settings.unsafe_mode);
        assert!(!settings.numeric);

        let cli = Cli::try_parse_from(["log2rotate", "-d"]).expect("flags parse");
        let settings = cli.rotation_settings(configured);
        assert!(settings.unsafe_mode);
        assert!(settings.numeric);
    }

    #[test]
    fn test_last_of_unsafe_and_no_unsafe_wins() {
        let cli = Cli::try_parse_from(["log2rotate", "-d", "--no-unsafe", "--unsafe"])
            .expect("flags parse");
        let settings = cli.rotation_settings(RotationSettings::default());
        assert!(settings.unsafe_mode);

        let cli = Cli::try_parse_from(["log2rotate", "-d", "--unsafe", "--no-unsafe"])
            .expect("flags parse");
        let settings = cli.rotation_settings(RotationSettings::default());
        assert!(!settings.unsafe_mode);
    }
}
