//! End-to-end rotation over raw backup names.
//!
//! The pipeline turns a list of names into a [`RetentionDecision`]:
//!
//! 1. Names the parser rejects are kept verbatim and counted.
//! 2. The `skip` newest parseable names are kept unconditionally.
//! 3. The rest go through the [`RetentionMatcher`].
//! 4. Everything not kept is marked for deletion.
//!
//! Input names are treated as a set: duplicates collapse onto their first
//! occurrence, and both sides of the decision list names in first-seen input
//! order.

use super::matcher::RetentionMatcher;
use super::metric::{AgeMetric, NumericAge};
use super::parser::{IdentifierParser, NumericParser, TimestampFormat};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Converts usize to f64 for metrics, capping at `u32::MAX`.
#[inline]
fn usize_to_f64(value: usize) -> f64 {
    let capped = u32::try_from(value).unwrap_or(u32::MAX);
    f64::from(capped)
}

/// Which side of the decision a caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// Backups to keep.
    Keep,
    /// Backups to delete.
    Delete,
}

/// Knobs for one rotation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Number of newest backups kept outside the log2 schedule.
    pub skip: usize,
    /// Tolerance, in age units, for matching an ideal offset.
    pub fuzz: u64,
    /// Omit unmatched ideal offsets instead of failing.
    pub unsafe_mode: bool,
}

impl RotationPolicy {
    /// Creates a policy with no skip, no fuzz and safe matching.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skip: 0,
            fuzz: 0,
            unsafe_mode: false,
        }
    }

    /// Sets how many of the newest backups are always kept.
    #[must_use]
    pub const fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the fuzz window.
    #[must_use]
    pub const fn with_fuzz(mut self, fuzz: u64) -> Self {
        self.fuzz = fuzz;
        self
    }

    /// Enables or disables unsafe matching.
    #[must_use]
    pub const fn with_unsafe(mut self, unsafe_mode: bool) -> Self {
        self.unsafe_mode = unsafe_mode;
        self
    }
}

/// Partition of the input names into keep and delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionDecision {
    /// Names to keep, in first-seen input order.
    pub keep: Vec<String>,
    /// Names to delete, in first-seen input order.
    pub delete: Vec<String>,
    /// Number of names kept because they could not be parsed.
    pub unparseable: usize,
    /// Number of names kept by the skip carve-out.
    pub skipped: usize,
}

impl RetentionDecision {
    /// Returns the side selected by `mode`.
    #[must_use]
    pub fn selected(&self, mode: OutputMode) -> &[String] {
        match mode {
            OutputMode::Keep => &self.keep,
            OutputMode::Delete => &self.delete,
        }
    }

    /// Consumes the decision, returning the side selected by `mode`.
    #[must_use]
    pub fn into_selected(self, mode: OutputMode) -> Vec<String> {
        match mode {
            OutputMode::Keep => self.keep,
            OutputMode::Delete => self.delete,
        }
    }

    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let total = self.keep.len() + self.delete.len();
        format!(
            "keeping {} of {} backups ({} unparseable, {} skipped), deleting {}",
            self.keep.len(),
            total,
            self.unparseable,
            self.skipped,
            self.delete.len()
        )
    }
}

/// A parsed name together with its position among the unique inputs.
struct Parsed<V> {
    index: usize,
    value: V,
}

/// Lifts a metric over values to one over [`Parsed`] entries.
struct ByValue<'m, M>(&'m M);

impl<V, M: AgeMetric<V>> AgeMetric<Parsed<V>> for ByValue<'_, M> {
    fn compare(&self, a: &Parsed<V>, b: &Parsed<V>) -> Ordering {
        self.0.compare(&a.value, &b.value)
    }

    fn distance(&self, newer: &Parsed<V>, older: &Parsed<V>) -> u64 {
        self.0.distance(&newer.value, &older.value)
    }
}

/// Runs the full rotation for one identifier scheme.
///
/// # Example
///
/// ```rust
/// use log2rotate::rotation::{OutputMode, RotationPipeline, RotationPolicy, TimestampFormat};
///
/// let names: Vec<String> = (1..=10).map(|d| format!("2023-01-{d:02}")).collect();
/// let pipeline = RotationPipeline::for_timestamps(TimestampFormat::default(), RotationPolicy::new());
///
/// let delete = pipeline.rotate(&names, OutputMode::Delete)?;
/// assert_eq!(delete, ["2023-01-02", "2023-01-03", "2023-01-04", "2023-01-06", "2023-01-08"]);
/// # Ok::<(), log2rotate::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RotationPipeline<P, M> {
    parser: P,
    metric: M,
    policy: RotationPolicy,
}

impl RotationPipeline<TimestampFormat, TimestampFormat> {
    /// Creates a pipeline over date/time names.
    #[must_use]
    pub fn for_timestamps(format: TimestampFormat, policy: RotationPolicy) -> Self {
        Self::new(format.clone(), format, policy)
    }
}

impl RotationPipeline<NumericParser, NumericAge> {
    /// Creates a pipeline over plain integer names.
    #[must_use]
    pub const fn for_numbers(policy: RotationPolicy) -> Self {
        Self::new(NumericParser, NumericAge, policy)
    }
}

impl<P, M> RotationPipeline<P, M> {
    /// Creates a pipeline from a parser, a metric over its output and a policy.
    #[must_use]
    pub const fn new(parser: P, metric: M, policy: RotationPolicy) -> Self {
        Self {
            parser,
            metric,
            policy,
        }
    }
}

impl<P, M> RotationPipeline<P, M>
where
    P: IdentifierParser,
    M: AgeMetric<P::Output>,
{
    /// Returns the names selected by `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentRetentionState`] if a backup the schedule
    /// expects is missing and the policy is not unsafe.
    pub fn rotate<S: AsRef<str>>(&self, inputs: &[S], mode: OutputMode) -> Result<Vec<String>> {
        self.decide(inputs)
            .map(|decision| decision.into_selected(mode))
    }

    /// Partitions `inputs` into names to keep and names to delete.
    ///
    /// Either the whole decision is returned or nothing is: a failure never
    /// yields a partial keep set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentRetentionState`] if a backup the schedule
    /// expects is missing and the policy is not unsafe.
    #[instrument(
        name = "log2rotate.pipeline.decide",
        skip(self, inputs),
        fields(
            component = "pipeline",
            inputs = inputs.len(),
            skip_newest = self.policy.skip,
            fuzz = self.policy.fuzz,
            unsafe_mode = self.policy.unsafe_mode
        )
    )]
    pub fn decide<S: AsRef<str>>(&self, inputs: &[S]) -> Result<RetentionDecision> {
        let mut seen = HashSet::with_capacity(inputs.len());
        let names: Vec<&str> = inputs
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| seen.insert(*name))
            .collect();

        let mut kept = vec![false; names.len()];
        let mut parseable = Vec::with_capacity(names.len());
        let mut unparseable = 0;

        for (index, name) in names.iter().enumerate() {
            match self.parser.parse(name) {
                Ok(value) => parseable.push(Parsed { index, value }),
                Err(e) => {
                    debug!(name, error = %e, "Keeping unparseable backup name");
                    kept[index] = true;
                    unparseable += 1;
                },
            }
        }

        if unparseable > 0 {
            warn!(count = unparseable, "Keeping backups with unparseable names");
        }

        let metric = ByValue(&self.metric);
        parseable.sort_by(|a, b| metric.compare(a, b));

        let skipped = parseable.split_off(parseable.len().saturating_sub(self.policy.skip));
        for entry in &skipped {
            kept[entry.index] = true;
        }

        if !parseable.is_empty() {
            let matcher = RetentionMatcher::new(metric)
                .with_fuzz(self.policy.fuzz)
                .with_unsafe(self.policy.unsafe_mode);

            let retained = matcher.select(&parseable).map_err(|e| {
                metrics::counter!("log2rotate_runs_total", "outcome" => "inconsistent")
                    .increment(1);
                match e {
                    Error::MissingExpectedBackup { offset, span, fuzz } => {
                        Error::InconsistentRetentionState { offset, span, fuzz }
                    },
                    other => other,
                }
            })?;

            for entry in retained {
                kept[entry.index] = true;
            }
        }

        let mut decision = RetentionDecision {
            unparseable,
            skipped: skipped.len(),
            ..RetentionDecision::default()
        };
        for (name, keep) in names.into_iter().zip(kept) {
            if keep {
                decision.keep.push(name.to_string());
            } else {
                decision.delete.push(name.to_string());
            }
        }

        metrics::counter!("log2rotate_runs_total", "outcome" => "ok").increment(1);
        metrics::gauge!("log2rotate_kept").set(usize_to_f64(decision.keep.len()));
        metrics::gauge!("log2rotate_deleted").set(usize_to_f64(decision.delete.len()));

        info!(
            kept = decision.keep.len(),
            deleted = decision.delete.len(),
            unparseable,
            skipped = decision.skipped,
            "Rotation decided"
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
        range.map(|d| format!("2023-01-{d:02}")).collect()
    }

    fn pipeline(policy: RotationPolicy) -> RotationPipeline<TimestampFormat, TimestampFormat> {
        RotationPipeline::for_timestamps(TimestampFormat::default(), policy)
    }

    #[test]
    fn test_decide_exact_schedule() {
        let decision = pipeline(RotationPolicy::new()).decide(&days(1..=10)).unwrap();

        assert_eq!(
            decision.keep,
            ["2023-01-01", "2023-01-05", "2023-01-07", "2023-01-09", "2023-01-10"]
        );
        assert_eq!(
            decision.delete,
            ["2023-01-02", "2023-01-03", "2023-01-04", "2023-01-06", "2023-01-08"]
        );
        assert_eq!(decision.unparseable, 0);
        assert_eq!(decision.skipped, 0);
    }

    #[test]
    fn test_output_follows_input_order() {
        let mut names = days(1..=10);
        names.reverse();
        let keep = pipeline(RotationPolicy::new())
            .rotate(&names, OutputMode::Keep)
            .unwrap();
        assert_eq!(
            keep,
            ["2023-01-10", "2023-01-09", "2023-01-07", "2023-01-05", "2023-01-01"]
        );
    }

    #[test]
    fn test_unparseable_names_kept_in_both_modes() {
        let mut names = days(1..=10);
        names.insert(3, "garbage".to_string());
        let pipeline = pipeline(RotationPolicy::new());

        let decision = pipeline.decide(&names).unwrap();
        assert_eq!(decision.unparseable, 1);
        assert!(decision.keep.contains(&"garbage".to_string()));
        assert!(!decision.delete.contains(&"garbage".to_string()));

        let delete = pipeline.rotate(&names, OutputMode::Delete).unwrap();
        assert!(!delete.contains(&"garbage".to_string()));
    }

    #[test]
    fn test_skip_larger_than_input_keeps_everything() {
        let decision = pipeline(RotationPolicy::new().with_skip(50))
            .decide(&days(1..=10))
            .unwrap();
        assert_eq!(decision.keep.len(), 10);
        assert!(decision.delete.is_empty());
        assert_eq!(decision.skipped, 10);
    }

    #[test]
    fn test_missing_backup_maps_to_inconsistent_state() {
        let names: Vec<String> = days(1..=10)
            .into_iter()
            .filter(|n| n != "2023-01-05")
            .collect();
        let err = pipeline(RotationPolicy::new()).decide(&names).unwrap_err();
        assert!(
            matches!(
                err,
                Error::InconsistentRetentionState {
                    offset: 6,
                    span: 10,
                    fuzz: 0
                }
            ),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let mut names = days(1..=4);
        names.push("2023-01-02".to_string());
        let decision = pipeline(RotationPolicy::new()).decide(&names).unwrap();
        assert_eq!(decision.keep, ["2023-01-01", "2023-01-03", "2023-01-04"]);
        assert_eq!(decision.delete, ["2023-01-02"]);
    }

    #[test]
    fn test_empty_input() {
        let names: Vec<String> = Vec::new();
        let decision = pipeline(RotationPolicy::new()).decide(&names).unwrap();
        assert_eq!(decision, RetentionDecision::default());
    }

    #[test]
    fn test_only_unparseable_input() {
        let decision = pipeline(RotationPolicy::new())
            .decide(&["lost+found", "README"])
            .unwrap();
        assert_eq!(decision.keep, ["lost+found", "README"]);
        assert_eq!(decision.unparseable, 2);
    }

    #[test]
    fn test_numeric_pipeline() {
        let names: Vec<String> = (100..=109).map(|n| n.to_string()).collect();
        let keep = RotationPipeline::for_numbers(RotationPolicy::new())
            .rotate(&names, OutputMode::Keep)
            .unwrap();
        assert_eq!(keep, ["100", "104", "106", "108", "109"]);
    }

    #[test]
    fn test_summary() {
        let decision = pipeline(RotationPolicy::new().with_skip(2))
            .decide(&days(1..=10))
            .unwrap();
        assert_eq!(
            decision.summary(),
            "keeping 6 of 10 backups (0 unparseable, 2 skipped), deleting 4"
        );
    }
}
