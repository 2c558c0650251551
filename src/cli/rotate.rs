//! Rotate CLI command.

use crate::config::RotationSettings;
use crate::rotation::{OutputMode, RetentionDecision, RotationPipeline};
use crate::{Error, Result};
use std::io::{self, BufRead, Write};

/// Output format for the selected backup names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One name per line (default).
    #[default]
    Lines,
    /// A JSON array of names.
    Json,
}

/// Rotate command handler.
#[derive(Debug, Clone)]
pub struct RotateCommand {
    settings: RotationSettings,
    mode: OutputMode,
    output: OutputFormat,
}

impl RotateCommand {
    /// Creates a rotate command printing the side selected by `mode`.
    #[must_use]
    pub fn new(settings: RotationSettings, mode: OutputMode) -> Self {
        Self {
            settings,
            mode,
            output: OutputFormat::default(),
        }
    }

    /// Sets the output format.
    #[must_use]
    pub const fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// Reads names from `input`, decides, and writes the selected names.
    ///
    /// The unparseable-name warning goes to `diagnostics`. On failure
    /// nothing is written to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentRetentionState`] when the history is
    /// missing an expected backup, [`Error::InvalidInput`] for a bad
    /// identifier format, and [`Error::OperationFailed`] on I/O errors.
    pub fn execute<R, W, E>(
        &self,
        input: R,
        out: &mut W,
        diagnostics: &mut E,
    ) -> Result<RetentionDecision>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let names = read_names(input)?;
        let policy = self.settings.policy();

        let decision = if self.settings.numeric {
            RotationPipeline::for_numbers(policy).decide(&names)?
        } else {
            RotationPipeline::for_timestamps(self.settings.timestamp_format()?, policy)
                .decide(&names)?
        };

        if decision.unparseable > 0 {
            writeln!(
                diagnostics,
                "warning: keeping {} backups with unparseable names",
                decision.unparseable
            )
            .map_err(|e| io_error("write_diagnostics", &e))?;
        }

        self.write_selected(out, decision.selected(self.mode))?;
        Ok(decision)
    }

    fn write_selected<W: Write>(&self, out: &mut W, names: &[String]) -> Result<()> {
        match self.output {
            OutputFormat::Lines => {
                for name in names {
                    writeln!(out, "{name}").map_err(|e| io_error("write_output", &e))?;
                }
            },
            OutputFormat::Json => {
                let json =
                    serde_json::to_string_pretty(names).map_err(|e| Error::OperationFailed {
                        operation: "serialize_output".to_string(),
                        cause: e.to_string(),
                    })?;
                writeln!(out, "{json}").map_err(|e| io_error("write_output", &e))?;
            },
        }
        out.flush().map_err(|e| io_error("write_output", &e))
    }
}

/// Reads backup names, one per line, trimming whitespace and skipping blank
/// lines.
///
/// # Errors
///
/// Returns an error if reading fails or the input is not UTF-8.
pub fn read_names<R: BufRead>(input: R) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for line in input.lines() {
        let line = line.map_err(|e| io_error("read_input", &e))?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn io_error(operation: &str, e: &io::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::AgeUnit;
    use std::io::Cursor;

    const TEN_DAYS: &str = "2023-01-01\n2023-01-02\n2023-01-03\n2023-01-04\n2023-01-05\n\
                            2023-01-06\n2023-01-07\n2023-01-08\n2023-01-09\n2023-01-10\n";

    fn run(cmd: &RotateCommand, input: &str) -> (Result<RetentionDecision>, String, String) {
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let result = cmd.execute(Cursor::new(input), &mut out, &mut diag);
        (
            result,
            String::from_utf8(out).expect("utf8 output"),
            String::from_utf8(diag).expect("utf8 diagnostics"),
        )
    }

    #[test]
    fn test_keep_lines() {
        let cmd = RotateCommand::new(RotationSettings::default(), OutputMode::Keep);
        let (result, out, diag) = run(&cmd, TEN_DAYS);
        assert!(result.is_ok());
        assert_eq!(
            out,
            "2023-01-01\n2023-01-05\n2023-01-07\n2023-01-09\n2023-01-10\n"
        );
        assert!(diag.is_empty());
    }

    #[test]
    fn test_delete_json() {
        let cmd = RotateCommand::new(RotationSettings::default(), OutputMode::Delete)
            .with_output(OutputFormat::Json);
        let (result, out, _) = run(&cmd, TEN_DAYS);
        assert!(result.is_ok());
        let names: Vec<String> = serde_json::from_str(&out).expect("json array");
        assert_eq!(
            names,
            ["2023-01-02", "2023-01-03", "2023-01-04", "2023-01-06", "2023-01-08"]
        );
    }

    #[test]
    fn test_unparseable_warning() {
        let cmd = RotateCommand::new(RotationSettings::default(), OutputMode::Keep);
        let input = format!("garbage\n{TEN_DAYS}");
        let (result, out, diag) = run(&cmd, &input);
        assert_eq!(result.map(|d| d.unparseable).ok(), Some(1));
        assert!(out.lines().any(|l| l == "garbage"));
        assert_eq!(diag, "warning: keeping 1 backups with unparseable names\n");
    }

    #[test]
    fn test_inconsistent_history_writes_nothing() {
        let cmd = RotateCommand::new(RotationSettings::default(), OutputMode::Delete);
        let input = TEN_DAYS.replace("2023-01-05\n", "");
        let (result, out, _) = run(&cmd, &input);
        assert!(matches!(
            result,
            Err(Error::InconsistentRetentionState { .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_numeric_names() {
        let settings = RotationSettings {
            numeric: true,
            ..RotationSettings::default()
        };
        let cmd = RotateCommand::new(settings, OutputMode::Keep);
        let (result, out, _) = run(&cmd, "1\n2\n3\n4\n");
        assert!(result.is_ok());
        assert_eq!(out, "1\n3\n4\n");
    }

    #[test]
    fn test_hourly_names_with_custom_format() {
        let settings = RotationSettings {
            format: "snap-%Y%m%d%H".to_string(),
            unit: AgeUnit::Hours,
            ..RotationSettings::default()
        };
        let cmd = RotateCommand::new(settings, OutputMode::Keep);
        let input = "snap-2024010100\nsnap-2024010101\nsnap-2024010102\nsnap-2024010103\n";
        let (result, out, _) = run(&cmd, input);
        assert!(result.is_ok());
        assert_eq!(out, "snap-2024010100\nsnap-2024010102\nsnap-2024010103\n");
    }

    #[test]
    fn test_invalid_format_is_reported() {
        let settings = RotationSettings {
            format: "%Q".to_string(),
            ..RotationSettings::default()
        };
        let cmd = RotateCommand::new(settings, OutputMode::Keep);
        let (result, out, _) = run(&cmd, TEN_DAYS);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_names_trims_and_skips_blank_lines() {
        let names = read_names(Cursor::new("  a \n\n\tb\n   \nc")).expect("names");
        assert_eq!(names, ["a", "b", "c"]);
    }
}
