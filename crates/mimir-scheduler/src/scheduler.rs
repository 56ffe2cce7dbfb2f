//! Ties cron evaluation, tick dedup, and persistence together into one
//! driver the binary can poll (§4.D).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mimir_types::Schedule;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cron_eval::{parse_timezone, CronSchedule};
use crate::error::{Result, SchedulerError};
use crate::store::ScheduleStore;
use crate::tick::{self, MissedTickPolicy};

/// A schedule that fired on a given tick, along with the pipeline ids it
/// asks the caller to dispatch. `mimir-scheduler` has no dependency on
/// `mimir-pipeline` or `mimir-queue`; dispatch is the caller's job.
#[derive(Debug, Clone)]
pub struct DueSchedule {
    pub schedule_id: Uuid,
    pub pipeline_ids: Vec<Uuid>,
    pub fired_at: DateTime<Utc>,
}

pub struct Scheduler {
    store: Arc<dyn ScheduleStore>,
    policy: MissedTickPolicy,
}

impl Scheduler {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            policy: MissedTickPolicy::default(),
        }
    }

    pub fn with_policy(store: Arc<dyn ScheduleStore>, policy: MissedTickPolicy) -> Self {
        Self { store, policy }
    }

    /// Register (or re-register) a schedule, computing its initial
    /// `next_fire_at` anchored at `registered_at` if it isn't set yet.
    pub fn register(&self, mut schedule: Schedule, registered_at: DateTime<Utc>) -> Result<()> {
        schedule
            .validate()
            .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;

        let cron = CronSchedule::parse(&schedule.cron_expression)?;
        let tz = parse_timezone(&schedule.timezone)?;

        if schedule.next_fire_at.is_none() {
            let anchor = schedule.last_fired_at.unwrap_or(registered_at);
            schedule.next_fire_at = tick::initial_next_fire(&cron, &tz, anchor);
        }

        debug!(schedule = %schedule.name, next_fire_at = ?schedule.next_fire_at, "registered schedule");
        self.store.upsert(schedule)
    }

    /// Evaluate every enabled schedule against `now`, persist the ones that
    /// advanced, and return those that fired.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<Vec<DueSchedule>> {
        let mut due = Vec::new();
        for schedule in self.store.load_all()? {
            if !schedule.enabled {
                continue;
            }
            let cron = CronSchedule::parse(&schedule.cron_expression)?;
            let tz = parse_timezone(&schedule.timezone)?;

            let Some(outcome) = tick::evaluate(schedule.next_fire_at, &cron, &tz, now, self.policy) else {
                continue;
            };

            let mut updated = schedule.clone();
            updated.last_fired_at = Some(outcome.new_last_fired_at);
            updated.next_fire_at = outcome.new_next_fire_at;
            self.store.upsert(updated)?;

            if outcome.fired {
                info!(schedule = %schedule.name, fired_at = %outcome.new_last_fired_at, "schedule fired");
                due.push(DueSchedule {
                    schedule_id: schedule.id,
                    pipeline_ids: schedule.pipeline_ids.clone(),
                    fired_at: outcome.new_last_fired_at,
                });
            } else {
                warn!(schedule = %schedule.name, "missed tick backlog skipped");
            }
        }
        Ok(due)
    }
}
