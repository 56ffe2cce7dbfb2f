//! Durable cron binding from a schedule to one or more pipelines (§3, §4.D).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub name: String,
    /// At least one pipeline id; enforced by `Schedule::validate`.
    pub pipeline_ids: Vec<Uuid>,
    /// 5-field classic cron: minute hour day-of-month month day-of-week.
    pub cron_expression: String,
    /// IANA timezone name, e.g. `"UTC"` or `"America/New_York"`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub last_fired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_fire_at: Option<DateTime<Utc>>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Schedule {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("schedule name cannot be empty".into());
        }
        if self.pipeline_ids.is_empty() {
            return Err("schedule must bind at least one pipeline".into());
        }
        if self.cron_expression.split_whitespace().count() != 5 {
            return Err(format!(
                "cron expression must have 5 fields, got {:?}",
                self.cron_expression
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            name: "hourly".into(),
            pipeline_ids: vec![Uuid::new_v4()],
            cron_expression: "0 * * * *".into(),
            timezone: default_timezone(),
            enabled: true,
            last_fired_at: None,
            next_fire_at: None,
        }
    }

    #[test]
    fn validate_accepts_five_field_cron() {
        assert!(schedule().validate().is_ok());
    }

    #[test]
    fn validate_rejects_wrong_field_count() {
        let mut s = schedule();
        s.cron_expression = "0 * * *".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_no_pipelines() {
        let mut s = schedule();
        s.pipeline_ids.clear();
        assert!(s.validate().is_err());
    }
}
