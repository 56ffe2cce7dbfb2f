//! At-most-once-per-tick firing decision (§4.D "At-most-once-per-tick",
//! "Missed ticks").

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::cron_eval::CronSchedule;

/// Which policy governs a backlog of missed ticks after downtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissedTickPolicy {
    /// Fire exactly one catch-up run for the whole backlog.
    #[default]
    CatchUp,
    /// Never fire for a backlog; only a single on-time tick fires.
    Skip,
}

/// Bound on how many missed instants we scan forward across a downtime gap;
/// beyond this we still catch up (or skip) using the last instant found.
const MAX_BACKLOG_SCAN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub fired: bool,
    pub new_last_fired_at: DateTime<Utc>,
    pub new_next_fire_at: Option<DateTime<Utc>>,
}

/// The instant a schedule should next be evaluated from, computed once at
/// registration (§4.D: "strictly greater than `lastFiredAt` (or `now` if
/// never fired)").
pub fn initial_next_fire(cron: &CronSchedule, tz: &Tz, registered_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    cron.next_after(registered_at, tz)
}

/// Evaluate one schedule against the current tick. `next_fire_at` is the
/// schedule's persisted next-fire instant; `None` means nothing is due.
/// Dedup key is `(scheduleId, new_last_fired_at)`: once persisted, the same
/// instant is never returned as due again because `new_next_fire_at` always
/// advances past it.
pub fn evaluate(
    next_fire_at: Option<DateTime<Utc>>,
    cron: &CronSchedule,
    tz: &Tz,
    now: DateTime<Utc>,
    policy: MissedTickPolicy,
) -> Option<TickOutcome> {
    let next_fire_at = next_fire_at?;
    if next_fire_at > now {
        return None;
    }

    let mut due_instants = vec![next_fire_at];
    let mut cursor = next_fire_at;
    while due_instants.len() < MAX_BACKLOG_SCAN {
        match cron.next_after(cursor, tz) {
            Some(t) if t <= now => {
                due_instants.push(t);
                cursor = t;
            }
            _ => break,
        }
    }

    let latest = *due_instants.last().expect("at least one due instant");
    let fired = match policy {
        MissedTickPolicy::CatchUp => true,
        MissedTickPolicy::Skip => due_instants.len() == 1,
    };

    Some(TickOutcome {
        fired,
        new_last_fired_at: latest,
        new_next_fire_at: cron.next_after(latest, tz),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sched() -> (CronSchedule, Tz) {
        (CronSchedule::parse("0 * * * *").unwrap(), Tz::UTC)
    }

    #[test]
    fn not_due_before_next_fire_at() {
        let (cron, tz) = sched();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 59, 0).unwrap();
        let next_fire_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
        assert!(evaluate(next_fire_at, &cron, &tz, now, MissedTickPolicy::CatchUp).is_none());
    }

    #[test]
    fn fires_once_for_a_single_due_tick() {
        let (cron, tz) = sched();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 5).unwrap();
        let next_fire_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
        let outcome = evaluate(next_fire_at, &cron, &tz, now, MissedTickPolicy::CatchUp).unwrap();
        assert!(outcome.fired);
        assert_eq!(outcome.new_last_fired_at, Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
        assert_eq!(outcome.new_next_fire_at, Some(Utc.with_ymd_and_hms(2026, 1, 1, 11, 0, 0).unwrap()));
    }

    #[test]
    fn restart_after_firing_does_not_refire_the_same_tick() {
        let (cron, tz) = sched();
        let fire_now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 5).unwrap();
        let next_fire_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
        let first = evaluate(next_fire_at, &cron, &tz, fire_now, MissedTickPolicy::CatchUp).unwrap();
        assert!(first.fired);

        // restart: persisted next_fire_at is whatever we computed above
        let restart_now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 45).unwrap();
        let second = evaluate(first.new_next_fire_at, &cron, &tz, restart_now, MissedTickPolicy::CatchUp);
        assert!(second.is_none());
    }

    #[test]
    fn catch_up_fires_once_for_a_backlog() {
        let (cron, tz) = sched();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 13, 30, 0).unwrap();
        let next_fire_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
        let outcome = evaluate(next_fire_at, &cron, &tz, now, MissedTickPolicy::CatchUp).unwrap();
        assert!(outcome.fired);
        assert_eq!(outcome.new_last_fired_at, Utc.with_ymd_and_hms(2026, 1, 1, 13, 0, 0).unwrap());
    }

    #[test]
    fn skip_policy_does_not_fire_for_a_backlog() {
        let (cron, tz) = sched();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 13, 30, 0).unwrap();
        let next_fire_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
        let outcome = evaluate(next_fire_at, &cron, &tz, now, MissedTickPolicy::Skip).unwrap();
        assert!(!outcome.fired);
        assert_eq!(outcome.new_last_fired_at, Utc.with_ymd_and_hms(2026, 1, 1, 13, 0, 0).unwrap());
    }
}
