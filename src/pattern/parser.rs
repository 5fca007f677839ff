//! Cron expression parsing
//!
//! Supported grammar per field: `*`, `?` (day fields), single values, ranges
//! `a-b`, steps `*/n` and `a-b/n`, lists `a,b,c`, `L` in day-of-month, month
//! names (`JAN`..`DEC`) and weekday names (`SUN`..`SAT`). Expressions carry
//! 5, 6 or 7 whitespace-separated fields:
//!
//! ```text
//! [second] minute hour day-of-month month day-of-week [year]
//! ```
//!
//! A 5-field expression gets an implicit second field of `0`.

use std::collections::BTreeSet;

use super::error::{PatternError, PatternResult};
use super::matcher::{PartMatcher, ValueMatcher};

/// Static description of one cron field
struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    aliases: &'static [(&'static str, u32)],
}

const MONTH_ALIASES: &[(&str, u32)] = &[
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
];

const DAY_ALIASES: &[(&str, u32)] = &[
    ("SUN", 0),
    ("MON", 1),
    ("TUE", 2),
    ("WED", 3),
    ("THU", 4),
    ("FRI", 5),
    ("SAT", 6),
];

const SECOND: FieldSpec = FieldSpec {
    name: "second",
    min: 0,
    max: 59,
    aliases: &[],
};
const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    aliases: &[],
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    aliases: &[],
};
const DAY_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    aliases: &[],
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    aliases: MONTH_ALIASES,
};
const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    aliases: DAY_ALIASES,
};
const YEAR: FieldSpec = FieldSpec {
    name: "year",
    min: 1970,
    max: 2099,
    aliases: &[],
};

/// Matchers in field order: second, minute, hour, dom, month, dow, year
pub type FieldMatchers = [PartMatcher; 7];

/// Parse a full cron expression into its seven field matchers
pub fn parse(expr: &str) -> PatternResult<FieldMatchers> {
    let parts: Vec<&str> = expr.split_whitespace().collect();

    let (second_src, rest): (&str, &[&str]) = match parts.len() {
        5 => ("0", &parts[..]),
        6 => (parts[0], &parts[1..]),
        7 => (parts[0], &parts[1..]),
        found => {
            return Err(PatternError::FieldCount {
                expr: expr.to_string(),
                found,
            })
        }
    };
    let year_src = if parts.len() == 7 { Some(rest[5]) } else { None };

    Ok([
        parse_field(&SECOND, second_src)?,
        parse_field(&MINUTE, rest[0])?,
        parse_field(&HOUR, rest[1])?,
        parse_day_of_month(rest[2])?,
        parse_field(&MONTH, rest[3])?,
        parse_day_of_week(rest[4])?,
        match year_src {
            Some(src) => parse_year(src)?,
            None => PartMatcher::Always,
        },
    ])
}

/// Parse a plain numeric field into a matcher
fn parse_field(spec: &FieldSpec, src: &str) -> PatternResult<PartMatcher> {
    if src == "*" || src == "?" {
        return Ok(PartMatcher::Always);
    }
    let values = collect_values(spec, src)?;
    Ok(PartMatcher::Values(ValueMatcher::new(values)))
}

/// Day-of-month additionally understands `L` (and its numeric spelling 32)
fn parse_day_of_month(src: &str) -> PatternResult<PartMatcher> {
    if src == "*" || src == "?" {
        return Ok(PartMatcher::Always);
    }

    let mut last = false;
    let mut values = Vec::new();
    for item in src.split(',') {
        if item.eq_ignore_ascii_case("L") || item == "32" {
            last = true;
            continue;
        }
        values.extend(collect_values(&DAY_OF_MONTH, item)?);
    }

    Ok(PartMatcher::DayOfMonth {
        values: ValueMatcher::new(values),
        last,
    })
}

/// Day-of-week normalizes `7` to `0` (both mean Sunday)
fn parse_day_of_week(src: &str) -> PatternResult<PartMatcher> {
    if src == "*" || src == "?" {
        return Ok(PartMatcher::Always);
    }
    let values = collect_values(&DAY_OF_WEEK, src)?
        .into_iter()
        .map(|v| if v == 7 { 0 } else { v })
        .collect();
    Ok(PartMatcher::Values(ValueMatcher::new(values)))
}

fn parse_year(src: &str) -> PatternResult<PartMatcher> {
    if src == "*" || src == "?" {
        return Ok(PartMatcher::Always);
    }
    let values = collect_values(&YEAR, src)?;
    Ok(PartMatcher::Year(BTreeSet::from_iter(values)))
}

/// Expand a comma-separated list of `value`, `a-b`, `*/n`, `a-b/n` items
fn collect_values(spec: &FieldSpec, src: &str) -> PatternResult<Vec<u32>> {
    let mut values = Vec::new();

    for item in src.split(',') {
        if item.is_empty() {
            return Err(invalid(spec, src, "empty list item"));
        }

        let (range_src, step) = match item.split_once('/') {
            Some((range, step_src)) => {
                let step: u32 = step_src
                    .parse()
                    .map_err(|_| invalid(spec, item, "step is not a number"))?;
                if step == 0 {
                    return Err(invalid(spec, item, "step must be positive"));
                }
                (range, step)
            }
            None => (item, 1),
        };

        let (start, end) = if range_src == "*" {
            (spec.min, spec.max)
        } else {
            match range_src.split_once('-') {
                Some((a, b)) => (resolve_value(spec, a)?, resolve_value(spec, b)?),
                None => {
                    let v = resolve_value(spec, range_src)?;
                    // A bare value with a step means "from v to max", per
                    // common cron extensions (`5/15` in the minute field).
                    if step > 1 {
                        (v, spec.max)
                    } else {
                        (v, v)
                    }
                }
            }
        };

        if start > end {
            return Err(invalid(
                spec,
                item,
                &format!("descending range {start}-{end}"),
            ));
        }

        values.extend((start..=end).step_by(step as usize));
    }

    Ok(values)
}

/// Resolve a single token to a number, consulting the field's name aliases
fn resolve_value(spec: &FieldSpec, token: &str) -> PatternResult<u32> {
    let value = match token.parse::<u32>() {
        Ok(v) => v,
        Err(_) => spec
            .aliases
            .iter()
            .find(|(name, _)| token.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
            .ok_or_else(|| invalid(spec, token, "not a number or known name"))?,
    };

    if value < spec.min || value > spec.max {
        return Err(PatternError::ValueOutOfRange {
            field: spec.name,
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok(value)
}

fn invalid(spec: &FieldSpec, value: &str, reason: &str) -> PatternError {
    PatternError::InvalidField {
        field: spec.name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
