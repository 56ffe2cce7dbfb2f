//! Cron evaluation: classic 5-field expressions against an IANA timezone
//! (§4.D "Cron semantics", "Tick resolution").
//!
//! The `cron` crate speaks Quartz, not classic cron, in two ways that matter
//! here: its day-of-week field is `1..=7` for Sun..Sat and rejects `0`, and
//! when both day-of-month and day-of-week are restricted it ANDs them
//! instead of ORing them. Classic cron (§4.D) uses `0..=7` with both `0` and
//! `7` meaning Sunday, and ORs day-of-month with day-of-week when both are
//! restricted. `CronSchedule` remaps the day-of-week field into Quartz's
//! numbering and, when both fields are restricted, evaluates a
//! dom-only-restricted schedule and a dow-only-restricted schedule side by
//! side and takes the earliest candidate from either.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

use crate::error::{Result, SchedulerError};

/// A parsed, evaluable cron expression. Internally the `cron` crate wants a
/// leading seconds field; we pin it to `0` since the spec's tick resolution
/// is one minute (§4.D). Holds one `cron::Schedule` in the common case, two
/// when day-of-month and day-of-week are both restricted and must be ORed.
pub struct CronSchedule {
    schedules: Vec<cron::Schedule>,
}

impl CronSchedule {
    /// Parse a classic 5-field expression: minute hour day-of-month month
    /// day-of-week.
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(SchedulerError::InvalidCron {
                expr: expr.to_string(),
                message: format!("expected 5 fields, got {}", fields.len()),
            });
        }
        let [minute, hour, dom, month, dow] = [fields[0], fields[1], fields[2], fields[3], fields[4]];
        let dow = remap_dow_field(dow);

        let dom_restricted = dom != "*";
        let dow_restricted = dow != "*";

        let schedules = if dom_restricted && dow_restricted {
            vec![
                build_schedule(expr, minute, hour, dom, month, "*")?,
                build_schedule(expr, minute, hour, "*", month, &dow)?,
            ]
        } else {
            vec![build_schedule(expr, minute, hour, dom, month, &dow)?]
        };

        Ok(Self { schedules })
    }

    /// The first firing instant strictly after `after`, in `timezone`,
    /// returned in UTC (§4.D "Tick resolution"). When day-of-month and
    /// day-of-week are both restricted this is the earliest candidate from
    /// either field's schedule, which is the OR semantics classic cron
    /// requires.
    pub fn next_after(&self, after: DateTime<Utc>, timezone: &Tz) -> Option<DateTime<Utc>> {
        let local_after = after.with_timezone(timezone);
        self.schedules
            .iter()
            .filter_map(|s| s.after(&local_after).next())
            .min()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn build_schedule(
    original_expr: &str,
    minute: &str,
    hour: &str,
    dom: &str,
    month: &str,
    dow: &str,
) -> Result<cron::Schedule> {
    let with_seconds = format!("0 {minute} {hour} {dom} {month} {dow}");
    cron::Schedule::from_str(&with_seconds).map_err(|e| SchedulerError::InvalidCron {
        expr: original_expr.to_string(),
        message: e.to_string(),
    })
}

/// Remaps a classic-cron day-of-week field (`0..=7`, both `0` and `7` =
/// Sunday) into the `cron` crate's Quartz numbering (`1..=7`, Sun..Sat).
/// Non-numeric tokens (`*`, names, `?`) and out-of-range numbers pass
/// through unchanged so the underlying crate's own validation still catches
/// malformed input.
fn remap_dow_field(field: &str) -> String {
    field.split(',').map(remap_dow_term).collect::<Vec<_>>().join(",")
}

fn remap_dow_term(term: &str) -> String {
    let (base, step) = match term.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (term, None),
    };
    let remapped_base = match base.split_once('-') {
        Some((lo, hi)) => format!("{}-{}", remap_dow_value(lo), remap_dow_value(hi)),
        None => remap_dow_value(base),
    };
    match step {
        Some(step) => format!("{remapped_base}/{step}"),
        None => remapped_base,
    }
}

fn remap_dow_value(value: &str) -> String {
    match value.parse::<u32>() {
        Ok(n) if n <= 7 => ((n % 7) + 1).to_string(),
        _ => value.to_string(),
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    Tz::from_str(name).map_err(|_| SchedulerError::InvalidTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Weekday};

    #[test]
    fn rejects_wrong_field_count() {
        assert!(CronSchedule::parse("0 * * *").is_err());
    }

    #[test]
    fn sunday_zero_and_seven_are_equivalent() {
        let via_zero = CronSchedule::parse("0 9 * * 0").unwrap();
        let via_seven = CronSchedule::parse("0 9 * * 7").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let next_zero = via_zero.next_after(after, &Tz::UTC).unwrap();
        let next_seven = via_seven.next_after(after, &Tz::UTC).unwrap();
        assert_eq!(next_zero, next_seven);
        assert_eq!(next_zero.weekday(), Weekday::Sun);
    }

    #[test]
    fn restricting_both_dom_and_dow_ors_instead_of_ands() {
        // "day 1 of the month OR any Sunday" must fire on a Sunday even in
        // a month where day 1 isn't one; classic cron ORs these fields.
        let sched = CronSchedule::parse("0 0 1 * 0").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap();
        let next = sched.next_after(after, &Tz::UTC).unwrap();
        assert_eq!(next.day(), 5);
        assert_eq!(next.month(), 4);
        assert_eq!(next.weekday(), Weekday::Sun);
    }

    #[test]
    fn hourly_fires_on_the_hour() {
        let sched = CronSchedule::parse("0 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 5).unwrap();
        let next = sched.next_after(after, &Tz::UTC).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert!(parse_timezone("Not/A_Zone").is_err());
    }

    #[test]
    fn known_iana_timezone_parses() {
        assert!(parse_timezone("America/New_York").is_ok());
    }
}
