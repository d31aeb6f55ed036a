use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

use crate::error::{Result, SchedulerError};

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// How far ahead `next_after` searches before giving up on an expression
/// that can never match (e.g. `0 0 30 2 *`).
const SEARCH_YEARS: i32 = 5;

/// A parsed cron expression, evaluated in UTC.
///
/// Accepts the classic five fields (`min hour dom month dow`) or six with a
/// leading seconds field. Each field is stored as a bitmask of the values it
/// matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    seconds: u64,
    minutes: u64,
    hours: u64,
    days: u64,
    months: u64,
    weekdays: u64,
    /// Day-of-month and day-of-week were both restricted: a day matches if
    /// either does.
    either_day: bool,
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    /// Value of the first entry in `names`.
    names_base: u32,
}

const SECOND: FieldSpec = FieldSpec { name: "second", min: 0, max: 59, names: &[], names_base: 0 };
const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59, names: &[], names_base: 0 };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23, names: &[], names_base: 0 };
const DAY: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31, names: &[], names_base: 0 };
const MONTH: FieldSpec = FieldSpec { name: "month", min: 1, max: 12, names: &MONTH_NAMES, names_base: 1 };
// 7 is accepted as a second spelling of Sunday and folded onto 0.
const WEEKDAY: FieldSpec = FieldSpec { name: "day-of-week", min: 0, max: 7, names: &WEEKDAY_NAMES, names_base: 0 };

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let expanded = match trimmed.to_ascii_lowercase().as_str() {
            "@yearly" | "@annually" => "0 0 1 1 *",
            "@monthly" => "0 0 1 * *",
            "@weekly" => "0 0 * * 0",
            "@daily" | "@midnight" => "0 0 * * *",
            "@hourly" => "0 * * * *",
            macro_name if macro_name.starts_with('@') => {
                return Err(invalid(expression, format!("unknown macro `{trimmed}`")))
            }
            _ => trimmed,
        };

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        let (second, rest) = match fields.len() {
            5 => ("0", &fields[..]),
            6 => (fields[0], &fields[1..]),
            n => {
                return Err(invalid(
                    expression,
                    format!("expected 5 or 6 fields, found {n}"),
                ))
            }
        };

        let field = |text: &str, bounds: &FieldSpec| {
            parse_field(text, bounds).map_err(|reason| invalid(expression, reason))
        };

        let mut weekdays = field(rest[4], &WEEKDAY)?;
        if weekdays & (1 << 7) != 0 {
            weekdays = (weekdays & !(1 << 7)) | 1;
        }

        Ok(Self {
            expression: expression.to_string(),
            seconds: field(second, &SECOND)?,
            minutes: field(rest[0], &MINUTE)?,
            hours: field(rest[1], &HOUR)?,
            days: field(rest[2], &DAY)?,
            months: field(rest[3], &MONTH)?,
            weekdays,
            either_day: is_restricted(rest[2]) && is_restricted(rest[4]),
        })
    }

    /// The expression as it was written.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The first matching instant strictly after `after`, truncated to whole
    /// seconds. `None` if nothing matches within the search horizon.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut t = after.with_nanosecond(0)? + Duration::seconds(1);
        let horizon = after.year() + SEARCH_YEARS;

        while t.year() <= horizon {
            if !bit(self.months, t.month()) {
                let (y, m) = if t.month() == 12 { (t.year() + 1, 1) } else { (t.year(), t.month() + 1) };
                t = Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).single()?;
                continue;
            }
            if !self.day_matches(&t) {
                t = t.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc();
                continue;
            }
            if !bit(self.hours, t.hour()) {
                t = t.with_minute(0)?.with_second(0)? + Duration::hours(1);
                continue;
            }
            if !bit(self.minutes, t.minute()) {
                t = t.with_second(0)? + Duration::minutes(1);
                continue;
            }
            if !bit(self.seconds, t.second()) {
                t += Duration::seconds(1);
                continue;
            }
            return Some(t);
        }
        None
    }

    /// Like [`next_after`](Self::next_after), but an expression with no
    /// firing inside the horizon is an `InvalidSchedule` error.
    pub fn first_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.next_after(after)
            .ok_or_else(|| invalid(&self.expression, "expression never fires".to_string()))
    }

    fn day_matches(&self, t: &DateTime<Utc>) -> bool {
        let dom = bit(self.days, t.day());
        let dow = bit(self.weekdays, t.weekday().num_days_from_sunday());
        if self.either_day {
            dom || dow
        } else {
            dom && dow
        }
    }
}

impl FromStr for CronSchedule {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

fn invalid(expression: &str, reason: String) -> SchedulerError {
    SchedulerError::InvalidSchedule {
        expression: expression.to_string(),
        reason,
    }
}

fn bit(mask: u64, value: u32) -> bool {
    mask & (1 << value) != 0
}

fn is_restricted(field: &str) -> bool {
    !(field.starts_with('*') || field.starts_with('?'))
}

/// Parse one field (`*`, `5`, `1-5`, `*/15`, `10-40/10`, `mon,wed`, ...)
/// into a bitmask.
fn parse_field(text: &str, bounds: &FieldSpec) -> std::result::Result<u64, String> {
    let mut mask = 0u64;
    for part in text.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("{}: invalid step `{step}`", bounds.name))?;
                if step == 0 {
                    return Err(format!("{}: step must be positive", bounds.name));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" || range == "?" {
            (bounds.min, bounds.max)
        } else if let Some((a, b)) = range.split_once('-') {
            (value(a, bounds)?, value(b, bounds)?)
        } else {
            let v = value(range, bounds)?;
            // `a/n` runs from a to the end of the field.
            (v, if step.is_some() { bounds.max } else { v })
        };

        if start > end {
            return Err(format!("{}: range `{range}` is reversed", bounds.name));
        }
        for v in (start..=end).step_by(step.unwrap_or(1) as usize) {
            mask |= 1 << v;
        }
    }
    Ok(mask)
}

fn value(text: &str, bounds: &FieldSpec) -> std::result::Result<u32, String> {
    let lower = text.to_ascii_lowercase();
    let v = match bounds.names.iter().position(|n| *n == lower) {
        Some(idx) => idx as u32 + bounds.names_base,
        None => text
            .parse::<u32>()
            .map_err(|_| format!("{}: invalid value `{text}`", bounds.name))?,
    };
    if v < bounds.min || v > bounds.max {
        return Err(format!(
            "{}: {v} is outside {}-{}",
            bounds.name, bounds.min, bounds.max
        ));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn next(expr: &str, from: DateTime<Utc>) -> DateTime<Utc> {
        CronSchedule::parse(expr).unwrap().next_after(from).unwrap()
    }

    #[test]
    fn every_five_minutes() {
        assert_eq!(next("*/5 * * * *", at(2024, 3, 1, 10, 2, 30)), at(2024, 3, 1, 10, 5, 0));
        // Strictly after: an instant that already matches moves on.
        assert_eq!(next("*/5 * * * *", at(2024, 3, 1, 10, 5, 0)), at(2024, 3, 1, 10, 10, 0));
    }

    #[test]
    fn six_field_seconds() {
        assert_eq!(next("* * * * * *", at(2024, 3, 1, 10, 2, 30)), at(2024, 3, 1, 10, 2, 31));
        assert_eq!(next("*/20 * * * * *", at(2024, 3, 1, 10, 2, 45)), at(2024, 3, 1, 10, 3, 0));
    }

    #[test]
    fn rolls_over_year_end() {
        assert_eq!(next("@daily", at(2024, 12, 31, 23, 0, 0)), at(2025, 1, 1, 0, 0, 0));
        assert_eq!(next("0 9 * jan mon", at(2024, 6, 1, 0, 0, 0)), at(2025, 1, 6, 9, 0, 0));
    }

    #[test]
    fn names_ranges_and_lists() {
        // 2024-03-01 is a Friday.
        assert_eq!(next("30 8 * * mon-fri", at(2024, 3, 1, 9, 0, 0)), at(2024, 3, 4, 8, 30, 0));
        assert_eq!(next("0 0,12 * * *", at(2024, 3, 1, 1, 0, 0)), at(2024, 3, 1, 12, 0, 0));
        assert_eq!(next("0 0 1 */3 *", at(2024, 2, 10, 0, 0, 0)), at(2024, 4, 1, 0, 0, 0));
    }

    #[test]
    fn sunday_as_seven() {
        let zero = CronSchedule::parse("0 0 * * 0").unwrap();
        let seven = CronSchedule::parse("0 0 * * 7").unwrap();
        let from = at(2024, 3, 1, 0, 0, 0);
        assert_eq!(zero.next_after(from), seven.next_after(from));
        assert_eq!(seven.next_after(from), Some(at(2024, 3, 3, 0, 0, 0)));
    }

    #[test]
    fn day_of_month_or_day_of_week() {
        // The 15th, or any Monday: from Fri 2024-03-01 the Monday comes first.
        assert_eq!(next("0 0 15 * mon", at(2024, 3, 1, 0, 0, 0)), at(2024, 3, 4, 0, 0, 0));
        // With only day-of-month restricted, weekdays do not widen the match.
        assert_eq!(next("0 0 15 * *", at(2024, 3, 1, 0, 0, 0)), at(2024, 3, 15, 0, 0, 0));
    }

    #[test]
    fn leap_day() {
        assert_eq!(next("0 0 29 2 *", at(2024, 3, 1, 0, 0, 0)), at(2028, 2, 29, 0, 0, 0));
    }

    #[test]
    fn impossible_date_has_no_next() {
        let s = CronSchedule::parse("0 0 30 2 *").unwrap();
        assert_eq!(s.next_after(at(2024, 1, 1, 0, 0, 0)), None);

        let err = s.first_after(at(2024, 1, 1, 0, 0, 0)).unwrap_err();
        assert_eq!(err.code(), "INVALID_SCHEDULE");
        assert!(err.to_string().contains("never fires"), "{err}");
        assert_eq!(
            CronSchedule::parse("0 0 29 2 *").unwrap().first_after(at(2024, 3, 1, 0, 0, 0)).unwrap(),
            at(2028, 2, 29, 0, 0, 0)
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        for bad in [
            "",
            "* * * *",
            "* * * * * * *",
            "60 * * * *",
            "* 24 * * *",
            "* * 0 * *",
            "* * * 13 *",
            "* * * * 8",
            "*/0 * * * *",
            "5-1 * * * *",
            "a * * * *",
            "@fortnightly",
        ] {
            let err = CronSchedule::parse(bad).unwrap_err();
            assert!(
                matches!(&err, SchedulerError::InvalidSchedule { expression, .. } if expression == bad),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn keeps_original_expression() {
        let s: CronSchedule = "@hourly".parse().unwrap();
        assert_eq!(s.expression(), "@hourly");
        assert_eq!(s.to_string(), "@hourly");
    }
}
