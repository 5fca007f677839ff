//! Composed cron pattern: seven field matchers over one instant

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, TimeZone, Timelike};
use chrono_tz::Tz;

use super::error::{PatternError, PatternResult};
use super::matcher::{days_in_month, PartMatcher};
use super::parser;

const SECOND: usize = 0;
const MINUTE: usize = 1;
const HOUR: usize = 2;
const DAY_OF_MONTH: usize = 3;
const MONTH: usize = 4;
const DAY_OF_WEEK: usize = 5;
const YEAR: usize = 6;

/// How many years past the start `next_match` scans when the year field is
/// unrestricted. Any satisfiable month/day combination occurs at least once
/// in this window, including Feb 29 across the skipped century leap years.
const SEARCH_HORIZON_YEARS: u32 = 8;

/// A parsed cron pattern
///
/// Composes the seven per-field matchers into a temporal predicate. Equality
/// compares matcher contents, so `1,2 * * * * *` and `2,1 * * * * *` are the
/// same pattern; `Display` renders the original source text.
///
/// # Day precedence
///
/// When both day-of-month and day-of-week are restricted, a day matches if
/// **either** field matches (classic cron behavior). An unrestricted field
/// (`*` or `?`) defers entirely to the other one.
#[derive(Debug, Clone)]
pub struct CronPattern {
    expr: String,
    matchers: parser::FieldMatchers,
}

impl CronPattern {
    /// Parse an expression; fails fast with a descriptive error
    pub fn new(expr: &str) -> PatternResult<Self> {
        let matchers = parser::parse(expr)?;
        Ok(Self {
            expr: expr.trim().to_string(),
            matchers,
        })
    }

    /// The source expression text
    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// Test an instant, truncated to its second, in the given timezone
    ///
    /// `match_second` / `match_year` mirror the scheduler toggles: when off,
    /// the corresponding field is ignored.
    pub fn matches(&self, tz: Tz, millis: i64, match_second: bool, match_year: bool) -> bool {
        let millis = millis - millis.rem_euclid(1000);
        let Some(dt) = tz.timestamp_millis_opt(millis).single() else {
            return false;
        };

        if match_second && !self.matchers[SECOND].test(dt.second()) {
            return false;
        }
        if !self.matchers[MINUTE].test(dt.minute()) {
            return false;
        }
        if !self.matchers[HOUR].test(dt.hour()) {
            return false;
        }
        if !self.matchers[MONTH].test(dt.month()) {
            return false;
        }
        if match_year && !self.matchers[YEAR].test(dt.year() as u32) {
            return false;
        }

        self.day_matches(
            dt.day(),
            dt.month(),
            dt.year() as u32,
            dt.weekday().num_days_from_sunday(),
        )
    }

    /// Smallest matching second-aligned instant `>= after`, if any
    ///
    /// Carry-based search: candidate days are enumerated per (year, month) and
    /// the time-of-day is found by cascading `next_after` through hour, minute
    /// and second. The search is bounded — an unsatisfiable pattern (Feb 30,
    /// an exhausted year set) yields `None` instead of spinning.
    pub fn next_match(&self, tz: Tz, after: i64) -> Option<i64> {
        let start_ms = after
            .checked_add(999)?
            .div_euclid(1000)
            .checked_mul(1000)?;
        let start = tz.timestamp_millis_opt(start_ms).single()?;

        let start_year = start.year() as u32;
        let last_year = match &self.matchers[YEAR] {
            PartMatcher::Year(years) => *years.iter().next_back()?,
            _ => start_year + SEARCH_HORIZON_YEARS,
        };

        for year in start_year..=last_year {
            if !self.matchers[YEAR].test(year) {
                continue;
            }
            let first_month = if year == start_year { start.month() } else { 1 };
            for month in first_month..=12 {
                if !self.matchers[MONTH].test(month) {
                    continue;
                }
                let on_start_month = year == start_year && month == start.month();
                let first_day = if on_start_month { start.day() } else { 1 };
                for day in first_day..=days_in_month(year, month) {
                    let weekday = NaiveDate::from_ymd_opt(year as i32, month, day)?
                        .weekday()
                        .num_days_from_sunday();
                    if !self.day_matches(day, month, year, weekday) {
                        continue;
                    }

                    let on_start_day = on_start_month && day == start.day();
                    let (h0, m0, s0) = if on_start_day {
                        (start.hour(), start.minute(), start.second())
                    } else {
                        (0, 0, 0)
                    };
                    if let Some(ms) = self.materialize(tz, year, month, day, h0, m0, s0) {
                        return Some(ms);
                    }
                }
            }
        }
        None
    }

    /// Day-of-month / day-of-week combination per the documented precedence
    fn day_matches(&self, day: u32, month: u32, year: u32, weekday: u32) -> bool {
        let dom = &self.matchers[DAY_OF_MONTH];
        let dow = &self.matchers[DAY_OF_WEEK];
        match (dom.is_restricted(), dow.is_restricted()) {
            (false, false) => true,
            (true, false) => dom.test_day(day, month, year),
            (false, true) => dow.test(weekday),
            (true, true) => dom.test_day(day, month, year) || dow.test(weekday),
        }
    }

    /// Find the first matching time-of-day on a fixed date and resolve it in
    /// the timezone, stepping over DST gaps
    fn materialize(
        &self,
        tz: Tz,
        year: u32,
        month: u32,
        day: u32,
        mut h: u32,
        mut m: u32,
        mut s: u32,
    ) -> Option<i64> {
        // A DST transition skips at most a couple of hours; a few retries
        // either land past the gap or overflow to the next day.
        for _ in 0..4 {
            let (hh, mm, ss) = self.next_time_of_day(h, m, s)?;
            match tz.with_ymd_and_hms(year as i32, month, day, hh, mm, ss) {
                chrono::LocalResult::Single(dt) => return Some(dt.timestamp_millis()),
                chrono::LocalResult::Ambiguous(dt, _) => return Some(dt.timestamp_millis()),
                chrono::LocalResult::None => {
                    h = hh + 1;
                    m = 0;
                    s = 0;
                }
            }
        }
        None
    }

    /// Cascade `next_after` through hour → minute → second with carry
    fn next_time_of_day(&self, mut h: u32, mut m: u32, mut s: u32) -> Option<(u32, u32, u32)> {
        loop {
            if h > 23 {
                return None;
            }
            let hour = self.matchers[HOUR].next_after(h)?;
            if hour > 23 {
                return None;
            }
            if hour > h {
                m = 0;
                s = 0;
                h = hour;
            }

            if m > 59 {
                h += 1;
                m = 0;
                s = 0;
                continue;
            }
            let minute = match self.matchers[MINUTE].next_after(m) {
                Some(v) if v <= 59 => v,
                _ => {
                    h += 1;
                    m = 0;
                    s = 0;
                    continue;
                }
            };
            if minute > m {
                s = 0;
            }

            let second = match self.matchers[SECOND].next_after(s) {
                Some(v) if v <= 59 => v,
                _ => {
                    m = minute + 1;
                    s = 0;
                    continue;
                }
            };
            return Some((h, minute, second));
        }
    }
}

impl PartialEq for CronPattern {
    fn eq(&self, other: &Self) -> bool {
        self.matchers == other.matchers
    }
}

impl Eq for CronPattern {}

impl fmt::Display for CronPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

impl FromStr for CronPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::Tz;

    const UTC: Tz = chrono_tz::UTC;

    fn ms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_every_ten_seconds() {
        let pattern: CronPattern = "*/10 * * * * *".parse().unwrap();
        for sec in 0..60 {
            let t = ms(2024, 5, 1, 10, 0, sec);
            assert_eq!(pattern.matches(UTC, t, true, true), sec % 10 == 0);
        }
    }

    #[test]
    fn test_second_truncation() {
        let pattern: CronPattern = "0 * * * * *".parse().unwrap();
        let t = ms(2024, 5, 1, 10, 5, 0) + 730;
        assert!(pattern.matches(UTC, t, true, true));
    }

    #[test]
    fn test_match_second_toggle() {
        let pattern: CronPattern = "15 30 * * * *".parse().unwrap();
        let t = ms(2024, 5, 1, 9, 30, 44);
        assert!(!pattern.matches(UTC, t, true, true));
        assert!(pattern.matches(UTC, t, false, true));
    }

    #[test]
    fn test_day_precedence_or_when_both_restricted() {
        // 13th of the month OR a Friday
        let pattern: CronPattern = "0 0 0 13 * 5".parse().unwrap();
        // 2024-09-13 is a Friday: matches both
        assert!(pattern.matches(UTC, ms(2024, 9, 13, 0, 0, 0), true, true));
        // 2024-08-13 is a Tuesday: matches day-of-month only
        assert!(pattern.matches(UTC, ms(2024, 8, 13, 0, 0, 0), true, true));
        // 2024-08-16 is a Friday: matches day-of-week only
        assert!(pattern.matches(UTC, ms(2024, 8, 16, 0, 0, 0), true, true));
        // 2024-08-14 is a Wednesday: matches neither
        assert!(!pattern.matches(UTC, ms(2024, 8, 14, 0, 0, 0), true, true));
    }

    #[test]
    fn test_day_unrestricted_defers() {
        let pattern: CronPattern = "0 0 0 ? * 1".parse().unwrap();
        // 2024-08-12 is a Monday
        assert!(pattern.matches(UTC, ms(2024, 8, 12, 0, 0, 0), true, true));
        assert!(!pattern.matches(UTC, ms(2024, 8, 13, 0, 0, 0), true, true));
    }

    #[test]
    fn test_last_day_of_month() {
        let pattern: CronPattern = "0 0 0 L * ?".parse().unwrap();
        assert!(pattern.matches(UTC, ms(2024, 2, 29, 0, 0, 0), true, true));
        assert!(pattern.matches(UTC, ms(2023, 2, 28, 0, 0, 0), true, true));
        assert!(pattern.matches(UTC, ms(2024, 4, 30, 0, 0, 0), true, true));
        assert!(!pattern.matches(UTC, ms(2024, 4, 29, 0, 0, 0), true, true));
    }

    #[test]
    fn test_next_match_within_minute() {
        let pattern: CronPattern = "*/10 * * * * *".parse().unwrap();
        let t = ms(2024, 5, 1, 10, 0, 3);
        let next = pattern.next_match(UTC, t).unwrap();
        assert_eq!(next, ms(2024, 5, 1, 10, 0, 10));
        assert!(pattern.matches(UTC, next, true, true));
    }

    #[test]
    fn test_next_match_inclusive_of_aligned_after() {
        let pattern: CronPattern = "*/10 * * * * *".parse().unwrap();
        let t = ms(2024, 5, 1, 10, 0, 20);
        assert_eq!(pattern.next_match(UTC, t), Some(t));
    }

    #[test]
    fn test_next_match_rolls_over_fields() {
        let pattern: CronPattern = "0 0 12 1 * ?".parse().unwrap();
        let t = ms(2024, 5, 2, 13, 0, 0);
        let next = pattern.next_match(UTC, t).unwrap();
        assert_eq!(next, ms(2024, 6, 1, 12, 0, 0));
    }

    #[test]
    fn test_next_match_leap_day() {
        let pattern: CronPattern = "0 0 0 29 2 ?".parse().unwrap();
        let t = ms(2024, 3, 1, 0, 0, 0);
        let next = pattern.next_match(UTC, t).unwrap();
        assert_eq!(next, ms(2028, 2, 29, 0, 0, 0));
    }

    #[test]
    fn test_next_match_unsatisfiable_terminates() {
        let pattern: CronPattern = "0 0 0 30 2 ?".parse().unwrap();
        assert_eq!(pattern.next_match(UTC, ms(2024, 1, 1, 0, 0, 0)), None);
    }

    #[test]
    fn test_next_match_exhausted_year_set() {
        let pattern: CronPattern = "0 0 0 1 1 ? 2020".parse().unwrap();
        assert_eq!(pattern.next_match(UTC, ms(2024, 1, 1, 0, 0, 0)), None);
    }

    #[test]
    fn test_equality_by_matcher_contents() {
        let a: CronPattern = "2,1 * * * * *".parse().unwrap();
        let b: CronPattern = "1-2 * * * * *".parse().unwrap();
        assert_eq!(a, b);
        let c: CronPattern = "1-3 * * * * *".parse().unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_timezone_dependence() {
        let pattern: CronPattern = "0 0 8 * * *".parse().unwrap();
        let t = ms(2024, 5, 1, 12, 0, 0); // 12:00 UTC == 08:00 in New York (EDT)
        assert!(!pattern.matches(UTC, t, true, true));
        assert!(pattern.matches(chrono_tz::America::New_York, t, true, true));
    }
}
