//! Log2 backup rotation.
//!
//! This module decides which backups of a history to keep so that retained
//! backups get exponentially sparser with age: a history spanning `n` units
//! keeps roughly `2 * log2(n)` backups, dense near the newest and sparse near
//! the oldest.
//!
//! # Overview
//!
//! | Piece | Role |
//! |-------|------|
//! | [`ideal_offsets`] | Offsets an ideal schedule keeps for a given span |
//! | [`AgeMetric`] | Ordering and age distance between identifiers |
//! | [`IdentifierParser`] | Turns raw backup names into identifiers |
//! | [`RetentionMatcher`] | Maps the ideal schedule onto existing backups |
//! | [`RotationPipeline`] | Unparseable passthrough, skip, match, partition |
//!
//! # Example
//!
//! ```rust
//! use log2rotate::rotation::{
//!     AgeUnit, OutputMode, RotationPipeline, RotationPolicy, TimestampFormat,
//! };
//!
//! let format = TimestampFormat::new("db-%Y%m%d-%H%M.sql.gz")?.with_unit(AgeUnit::Hours);
//! let policy = RotationPolicy::new().with_skip(24).with_fuzz(1);
//! let pipeline = RotationPipeline::for_timestamps(format, policy);
//!
//! let names = ["db-20240101-0000.sql.gz", "db-20240101-0100.sql.gz", "notes.txt"];
//! let keep = pipeline.rotate(&names, OutputMode::Keep)?;
//! assert_eq!(keep.len(), 3);
//! # Ok::<(), log2rotate::Error>(())
//! ```

mod matcher;
mod metric;
mod parser;
mod pipeline;
mod schedule;

pub use matcher::RetentionMatcher;
pub use metric::{AgeMetric, NumericAge};
pub use parser::{AgeUnit, DEFAULT_FORMAT, IdentifierParser, NumericParser, TimestampFormat};
pub use pipeline::{OutputMode, RetentionDecision, RotationPipeline, RotationPolicy};
pub use schedule::ideal_offsets;
