//! Reconciles the ideal schedule against the backups that actually exist.
//!
//! Real backup histories have gaps: a nightly job fails, or runs drift by a
//! few minutes. The matcher maps every ideal offset onto a concrete backup,
//! optionally accepting one up to `fuzz` units newer than ideal.
//!
//! # Offset collisions
//!
//! When several identifiers share an offset (for instance two backups on the
//! same day while measuring in days), the one that sorts last under the
//! metric wins. Among identifiers the metric considers equal, the later one
//! in input order wins.

use super::metric::AgeMetric;
use super::schedule::ideal_offsets;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

/// Selects which identifiers of a working set to retain.
#[derive(Debug, Clone)]
pub struct RetentionMatcher<M> {
    metric: M,
    fuzz: u64,
    unsafe_mode: bool,
}

impl<M> RetentionMatcher<M> {
    /// Creates a matcher with no fuzz that fails on missing backups.
    #[must_use]
    pub const fn new(metric: M) -> Self {
        Self {
            metric,
            fuzz: 0,
            unsafe_mode: false,
        }
    }

    /// Accepts a backup up to `fuzz` units newer than an ideal offset.
    #[must_use]
    pub const fn with_fuzz(mut self, fuzz: u64) -> Self {
        self.fuzz = fuzz;
        self
    }

    /// Skips unmatched ideal offsets instead of failing.
    #[must_use]
    pub const fn with_unsafe(mut self, unsafe_mode: bool) -> Self {
        self.unsafe_mode = unsafe_mode;
        self
    }

    /// Returns the identifiers to retain.
    ///
    /// Sets of fewer than two identifiers are returned unchanged. Otherwise
    /// the span from oldest to newest is fed to [`ideal_offsets`] and each
    /// ideal offset, oldest first, is matched against the backup at that
    /// offset or up to `fuzz` offsets past it. The result has no duplicates;
    /// its order is not significant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingExpectedBackup`] for the first ideal offset
    /// with no backup inside its fuzz window, unless unsafe mode is set.
    #[instrument(
        name = "log2rotate.matcher.select",
        skip(self, identifiers),
        fields(
            component = "matcher",
            count = identifiers.len(),
            fuzz = self.fuzz,
            unsafe_mode = self.unsafe_mode,
            span = tracing::field::Empty
        )
    )]
    pub fn select<'a, T>(&self, identifiers: &'a [T]) -> Result<Vec<&'a T>>
    where
        M: AgeMetric<T>,
    {
        if identifiers.len() < 2 {
            return Ok(identifiers.iter().collect());
        }

        let mut sorted: Vec<&T> = identifiers.iter().collect();
        sorted.sort_by(|a, b| self.metric.compare(a, b));

        let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
            return Ok(sorted);
        };

        let span = self.metric.distance(last, first).saturating_add(1);
        tracing::Span::current().record("span", span);

        let mut by_offset: BTreeMap<u64, &T> = BTreeMap::new();
        for &backup in &sorted {
            by_offset.insert(self.metric.distance(last, backup).saturating_add(1), backup);
        }

        let mut matched: Vec<u64> = Vec::new();
        let mut retained = Vec::new();

        for offset in ideal_offsets(span).into_iter().rev() {
            let hit = by_offset
                .range(offset..=offset.saturating_add(self.fuzz))
                .next()
                .map(|(&candidate, &backup)| (candidate, backup));

            match hit {
                Some((candidate, backup)) => {
                    trace!(offset, candidate, "Matched ideal offset");
                    if !matched.contains(&candidate) {
                        matched.push(candidate);
                        retained.push(backup);
                    }
                },
                None if self.unsafe_mode => {
                    debug!(offset, span, "No backup for ideal offset, skipping");
                },
                None => {
                    return Err(Error::MissingExpectedBackup {
                        offset,
                        span,
                        fuzz: self.fuzz,
                    });
                },
            }
        }

        debug!(span, retained = retained.len(), "Selected retained backups");
        Ok(retained)
    }
}
