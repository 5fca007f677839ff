//! Cron expression parsing and matching
//!
//! A [`CronPattern`] composes seven per-field matchers (second, minute, hour,
//! day-of-month, month, day-of-week, year) into a temporal predicate with two
//! operations: testing an instant and finding the next matching instant.
//!
//! # Example
//!
//! ```
//! use cronwheel::pattern::CronPattern;
//!
//! let pattern: CronPattern = "*/10 * * * * *".parse().unwrap();
//! let tz = chrono_tz::UTC;
//! let now = chrono::Utc::now().timestamp_millis();
//! if let Some(next) = pattern.next_match(tz, now) {
//!     assert!(next >= now);
//!     assert!(pattern.matches(tz, next, true, true));
//! }
//! ```

mod cron;
mod error;
mod matcher;
mod parser;

pub use cron::CronPattern;
pub use error::{PatternError, PatternResult};
pub use matcher::{PartMatcher, ValueMatcher};
