//! # log2rotate
//!
//! Rotate backups using exponentially-growing periods.
//!
//! Given the names of all existing backups, log2rotate decides which to keep
//! so that recent history stays dense while older history thins out
//! logarithmically. Storage grows with the logarithm of the history length.
//!
//! ## Features
//!
//! - Pure, synchronous selection over an in-memory list of names
//! - Date/time names described by `strftime` patterns, or plain integers
//! - Fuzzy matching for histories with gaps
//! - Safe by default: refuses to answer when an expected backup is missing
//! - Names that do not parse are always kept
//!
//! ## Example
//!
//! ```rust
//! use log2rotate::rotation::{OutputMode, RotationPipeline, RotationPolicy, TimestampFormat};
//!
//! let names: Vec<String> = (1..=10).map(|d| format!("2023-01-{d:02}")).collect();
//! let pipeline = RotationPipeline::for_timestamps(TimestampFormat::default(), RotationPolicy::new());
//!
//! let keep = pipeline.rotate(&names, OutputMode::Keep)?;
//! assert_eq!(keep, ["2023-01-01", "2023-01-05", "2023-01-07", "2023-01-09", "2023-01-10"]);
//! # Ok::<(), log2rotate::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod observability;
pub mod rotation;

// Re-exports for convenience
pub use config::{Log2RotateConfig, LoggingSettings, RotationSettings};
pub use rotation::{
    AgeMetric, AgeUnit, IdentifierParser, OutputMode, RetentionDecision, RetentionMatcher,
    RotationPipeline, RotationPolicy, TimestampFormat, ideal_offsets,
};

/// Error type for log2rotate operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `UnparseableIdentifier` | A backup name does not match the identifier format |
/// | `MissingExpectedBackup` | The matcher finds no backup for an ideal offset |
/// | `InconsistentRetentionState` | A rotation aborts because of a missing backup |
/// | `InvalidInput` | Bad identifier format, age unit or option value |
/// | `OperationFailed` | Config, log file or stream I/O fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A backup name could not be parsed.
    ///
    /// Never fatal to a rotation: the pipeline keeps such names verbatim.
    #[error("unparseable identifier '{raw}': {cause}")]
    UnparseableIdentifier {
        /// The raw name.
        raw: String,
        /// Why parsing failed.
        cause: String,
    },

    /// No backup lies within the fuzz window of an ideal offset.
    #[error("no backup within {fuzz} units of offset {offset} (span {span})")]
    MissingExpectedBackup {
        /// The unmatched ideal offset, 1 being the newest backup.
        offset: u64,
        /// Span of the working set in age units, plus one.
        span: u64,
        /// Fuzz window that was searched.
        fuzz: u64,
    },

    /// A rotation was aborted because the history is missing a backup that
    /// the schedule says should have been kept.
    ///
    /// No keep or delete set is produced. Retrying with unsafe mode or a
    /// larger fuzz window proceeds anyway.
    #[error(
        "backups that should have been kept are missing from the input list \
         (no match for offset {offset} of span {span} within fuzz {fuzz})"
    )]
    InconsistentRetentionState {
        /// The unmatched ideal offset, 1 being the newest backup.
        offset: u64,
        /// Span of the working set in age units, plus one.
        span: u64,
        /// Fuzz window that was searched.
        fuzz: u64,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for log2rotate operations.
pub type Result<T> = std::result::Result<T, Error>;
