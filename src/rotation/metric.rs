//! Age metrics over backup identifiers.

use std::cmp::Ordering;

/// Ordering and age distance between two identifiers.
///
/// Implementations must keep `distance` consistent with `compare`: for
/// `a >= b >= c`, `distance(a, c) == distance(a, b) + distance(b, c)`. The
/// rotation algorithm relies on this but does not check it.
pub trait AgeMetric<T: ?Sized> {
    /// Total order over identifiers, older first.
    fn compare(&self, a: &T, b: &T) -> Ordering;

    /// Whole age units from `older` up to `newer`.
    ///
    /// Only meaningful when `newer` is not older than `older`; returns zero
    /// when both are equal.
    fn distance(&self, newer: &T, older: &T) -> u64;
}

impl<T: ?Sized, M: AgeMetric<T> + ?Sized> AgeMetric<T> for &M {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (**self).compare(a, b)
    }

    fn distance(&self, newer: &T, older: &T) -> u64 {
        (**self).distance(newer, older)
    }
}

/// Plain integer identifiers where one unit of difference is one age unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumericAge;

impl AgeMetric<i64> for NumericAge {
    fn compare(&self, a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }

    fn distance(&self, newer: &i64, older: &i64) -> u64 {
        // Negative differences violate the contract; treat them as zero.
        u64::try_from(i128::from(*newer) - i128::from(*older)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_age_compare() {
        assert_eq!(NumericAge.compare(&1, &2), Ordering::Less);
        assert_eq!(NumericAge.compare(&2, &2), Ordering::Equal);
        assert_eq!(NumericAge.compare(&-1, &-5), Ordering::Greater);
    }

    #[test]
    fn test_numeric_age_distance() {
        assert_eq!(NumericAge.distance(&10, &1), 9);
        assert_eq!(NumericAge.distance(&7, &7), 0);
        assert_eq!(NumericAge.distance(&i64::MAX, &i64::MIN), u64::MAX);
    }

    #[test]
    fn test_numeric_age_distance_is_additive() {
        let (a, b, c) = (40_i64, 17, -3);
        assert_eq!(
            NumericAge.distance(&a, &c),
            NumericAge.distance(&a, &b) + NumericAge.distance(&b, &c)
        );
    }

    #[test]
    fn test_numeric_age_reversed_distance_clamps_to_zero() {
        assert_eq!(NumericAge.distance(&1, &10), 0);
    }

    #[test]
    fn test_metric_through_reference() {
        let metric = &NumericAge;
        assert_eq!(AgeMetric::<i64>::distance(&metric, &5, &2), 3);
    }
}
