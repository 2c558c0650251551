//! Ideal log2 retention schedule.
//!
//! The schedule is computed purely from the span of a backup history and is
//! independent of any concrete identifiers. Offsets are 1-indexed from the
//! newest backup: offset 1 is the newest, offset `n` is the oldest.

use std::collections::BTreeSet;

/// Returns the offsets an ideal log2 schedule retains within a span of `n`.
///
/// The schedule always contains `n` itself (for `n >= 1`) and then recurses on
/// `n - 2^(floor(log2 n) - 1)`, halving the remaining window each step. The
/// result has roughly `2 * log2(n)` entries.
///
/// # Examples
///
/// ```rust
/// use log2rotate::rotation::ideal_offsets;
///
/// let offsets: Vec<u64> = ideal_offsets(10).into_iter().collect();
/// assert_eq!(offsets, vec![1, 2, 4, 6, 10]);
/// assert!(ideal_offsets(0).is_empty());
/// ```
#[must_use]
pub fn ideal_offsets(n: u64) -> BTreeSet<u64> {
    let mut offsets = BTreeSet::new();
    let mut remaining = n;

    while remaining >= 2 {
        offsets.insert(remaining);
        // ilog2 >= 1 here, so the step is in [1, remaining / 2].
        remaining -= 1 << (remaining.ilog2() - 1);
    }

    if remaining == 1 {
        offsets.insert(1);
    }

    offsets
}
