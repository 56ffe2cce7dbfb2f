mod cron_eval;
mod error;
mod scheduler;
mod store;
mod tick;

pub use cron_eval::{parse_timezone, CronSchedule};
pub use error::{Result, SchedulerError};
pub use scheduler::{DueSchedule, Scheduler};
pub use store::{FileScheduleStore, InMemoryScheduleStore, ScheduleStore};
pub use tick::{evaluate, initial_next_fire, MissedTickPolicy, TickOutcome};
