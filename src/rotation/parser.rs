//! Parsing raw backup names into orderable identifiers.
//!
//! Two schemes are provided:
//!
//! - [`TimestampFormat`]: a `strftime`-style pattern such as `backup-%Y-%m-%d`,
//!   measured in a configurable [`AgeUnit`].
//! - [`NumericParser`]: plain signed integers, paired with
//!   [`NumericAge`](super::NumericAge).

use super::metric::AgeMetric;
use crate::{Error, Result};
use chrono::format::{Item, Parsed, StrftimeItems};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::cmp::Ordering;
use std::str::FromStr;

/// Default identifier format: ISO calendar dates.
pub const DEFAULT_FORMAT: &str = "%Y-%m-%d";

/// Turns a raw backup name into an identifier.
///
/// A failure is per item: the pipeline keeps unparseable names verbatim and
/// never lets them into the retention decision.
pub trait IdentifierParser {
    /// Parsed identifier type.
    type Output;

    /// Parses one raw name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnparseableIdentifier`] if `raw` does not match the
    /// expected format.
    fn parse(&self, raw: &str) -> Result<Self::Output>;
}

/// Parses identifiers as base-10 signed integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumericParser;

impl IdentifierParser for NumericParser {
    type Output = i64;

    fn parse(&self, raw: &str) -> Result<i64> {
        raw.parse::<i64>()
            .map_err(|e| Error::UnparseableIdentifier {
                raw: raw.to_string(),
                cause: e.to_string(),
            })
    }
}

/// Unit that one step of age distance stands for.
///
/// Parsed case-insensitively from full names (`hours`), singular names
/// (`hour`) or abbreviations (`h`), both on the command line and in config
/// files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum AgeUnit {
    /// One second.
    Seconds,
    /// One minute.
    Minutes,
    /// One hour.
    Hours,
    /// One calendar day of 86400 seconds.
    #[default]
    Days,
    /// Seven days.
    Weeks,
}

impl AgeUnit {
    /// Length of the unit in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3_600,
            Self::Days => 86_400,
            Self::Weeks => 604_800,
        }
    }
}

impl FromStr for AgeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Ok(Self::Seconds),
            "m" | "min" | "minute" | "minutes" => Ok(Self::Minutes),
            "h" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            "w" | "week" | "weeks" => Ok(Self::Weeks),
            other => Err(Error::InvalidInput(format!(
                "unknown age unit '{other}' (expected seconds, minutes, hours, days or weeks)"
            ))),
        }
    }
}

impl TryFrom<String> for AgeUnit {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Date/time identifiers described by a `strftime` pattern.
///
/// The whole name must match the pattern. Fields the pattern leaves out
/// default to zero, so `%Y-%m-%d` yields midnight. Names carrying a UTC
/// offset (`%z`) are normalised to UTC before comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
    unit: AgeUnit,
}

impl TimestampFormat {
    /// Creates a format from a `strftime` pattern, measuring age in days.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the pattern is empty or contains an
    /// unknown specifier.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(Error::InvalidInput("identifier format is empty".to_string()));
        }
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidInput(format!(
                "invalid identifier format '{pattern}'"
            )));
        }

        Ok(Self {
            pattern,
            unit: AgeUnit::default(),
        })
    }

    /// Sets the age unit.
    #[must_use]
    pub const fn with_unit(mut self, unit: AgeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Returns the `strftime` pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the age unit.
    #[must_use]
    pub const fn unit(&self) -> AgeUnit {
        self.unit
    }

    fn parse_timestamp(&self, raw: &str) -> chrono::ParseResult<NaiveDateTime> {
        let mut parsed = Parsed::new();
        chrono::format::parse(&mut parsed, raw, StrftimeItems::new(&self.pattern))?;

        if parsed.timestamp().is_none() {
            match (parsed.hour_div_12(), parsed.hour_mod_12()) {
                (None, None) => parsed.set_hour(0)?,
                // `%I` without `%p` reads as AM.
                (None, Some(_)) => parsed.set_ampm(false)?,
                _ => {},
            }
            if parsed.minute().is_none() {
                parsed.set_minute(0)?;
            }
            if parsed.second().is_none() {
                parsed.set_second(0)?;
            }
        }

        if parsed.offset().is_some() {
            return parsed.to_datetime().map(|dt| dt.naive_utc());
        }
        parsed.to_naive_datetime_with_offset(0)
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_FORMAT.to_string(),
            unit: AgeUnit::default(),
        }
    }
}

impl IdentifierParser for TimestampFormat {
    type Output = NaiveDateTime;

    fn parse(&self, raw: &str) -> Result<NaiveDateTime> {
        self.parse_timestamp(raw)
            .map_err(|e| Error::UnparseableIdentifier {
                raw: raw.to_string(),
                cause: e.to_string(),
            })
    }
}

impl AgeMetric<NaiveDateTime> for TimestampFormat {
    fn compare(&self, a: &NaiveDateTime, b: &NaiveDateTime) -> Ordering {
        a.cmp(b)
    }

    fn distance(&self, newer: &NaiveDateTime, older: &NaiveDateTime) -> u64 {
        let elapsed = newer.signed_duration_since(*older).num_seconds();
        u64::try_from(elapsed / self.unit.seconds()).unwrap_or(0)
    }
}
