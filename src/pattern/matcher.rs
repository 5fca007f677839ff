//! Per-field matchers composed into a [`CronPattern`](super::CronPattern)

use std::collections::BTreeSet;

/// Matcher for a single cron field
///
/// Every variant answers two questions: does a value match, and what is the
/// smallest matching value at or above a given one. `next_after` returning
/// `None` means the field has no admissible value left in range, which forces
/// a rollover of the next coarser field during `next_match` searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartMatcher {
    /// Matches every value (`*`, and `?` for the day fields)
    Always,

    /// Discrete sorted value set (seconds, minutes, hours, months, weekdays)
    Values(ValueMatcher),

    /// Day-of-month set, with optional "last day of month" marker
    ///
    /// `L` (parsed to the out-of-range literal 32) is resolved at match time
    /// against the actual month length, so it needs the calendar context that
    /// the other variants do not.
    DayOfMonth { values: ValueMatcher, last: bool },

    /// Year set
    ///
    /// Years are sparse and unbounded upward, so an ordered set bounds memory
    /// where a bit array cannot.
    Year(BTreeSet<u32>),
}

impl PartMatcher {
    /// Whether this field restricts anything at all
    ///
    /// Drives the day-of-month/day-of-week precedence rule: an unrestricted
    /// day field defers to the other one.
    pub fn is_restricted(&self) -> bool {
        !matches!(self, PartMatcher::Always)
    }

    /// Test a field value, ignoring calendar context
    ///
    /// For `DayOfMonth` this only consults the literal value set; use
    /// [`PartMatcher::test_day`] when the month length matters.
    pub fn test(&self, value: u32) -> bool {
        match self {
            PartMatcher::Always => true,
            PartMatcher::Values(values) => values.test(value),
            PartMatcher::DayOfMonth { values, .. } => values.test(value),
            PartMatcher::Year(years) => years.contains(&value),
        }
    }

    /// Test a day-of-month value against a concrete month
    pub fn test_day(&self, day: u32, month: u32, year: u32) -> bool {
        match self {
            PartMatcher::DayOfMonth { values, last } => {
                values.test(day) || (*last && day == days_in_month(year, month))
            }
            _ => self.test(day),
        }
    }

    /// Smallest matching value `>= value`, or `None` when the field rolls over
    pub fn next_after(&self, value: u32) -> Option<u32> {
        match self {
            PartMatcher::Always => Some(value),
            PartMatcher::Values(values) => values.next_after(value),
            PartMatcher::DayOfMonth { values, .. } => values.next_after(value),
            PartMatcher::Year(years) => years.range(value..).next().copied(),
        }
    }
}

/// Sorted discrete value set with binary-search membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMatcher {
    values: Vec<u32>,
}

impl ValueMatcher {
    /// Build from an arbitrary value list; sorts and deduplicates
    pub fn new(mut values: Vec<u32>) -> Self {
        values.sort_unstable();
        values.dedup();
        Self { values }
    }

    pub fn test(&self, value: u32) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    /// Smallest contained value `>= value`
    pub fn next_after(&self, value: u32) -> Option<u32> {
        let idx = self.values.partition_point(|&v| v < value);
        self.values.get(idx).copied()
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }
}

/// Number of days in a month, leap-aware
pub fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

pub fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
