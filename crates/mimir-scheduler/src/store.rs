//! Persistence for `lastFiredAt`/`nextFireAt` so at-most-once-per-tick
//! survives restart (§4.D, SPEC_FULL §4 "Scheduler persistence trait").

use std::collections::HashMap;
use std::path::PathBuf;

use mimir_types::Schedule;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Result, SchedulerError};

pub trait ScheduleStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<Schedule>>;
    fn upsert(&self, schedule: Schedule) -> Result<()>;
    fn get(&self, id: Uuid) -> Result<Option<Schedule>>;
}

/// In-memory store for tests and single-run deployments; nothing survives
/// process restart.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    entries: RwLock<HashMap<Uuid, Schedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScheduleStore for InMemoryScheduleStore {
    fn load_all(&self) -> Result<Vec<Schedule>> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn upsert(&self, schedule: Schedule) -> Result<()> {
        self.entries.write().insert(schedule.id, schedule);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<Schedule>> {
        Ok(self.entries.read().get(&id).cloned())
    }
}

/// File-backed JSON store: the whole schedule set lives in one file,
/// rewritten atomically on every `upsert` so `lastFiredAt` survives a
/// restart (§4.D "This holds across restart").
pub struct FileScheduleStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    fn read_all(&self) -> Result<Vec<Schedule>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| SchedulerError::StoreUnavailable(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| SchedulerError::StoreUnavailable(e.to_string()))
    }

    fn write_all(&self, schedules: &[Schedule]) -> Result<()> {
        let text = serde_json::to_string_pretty(schedules)
            .map_err(|e| SchedulerError::StoreUnavailable(e.to_string()))?;
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, text).map_err(|e| SchedulerError::StoreUnavailable(e.to_string()))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| SchedulerError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}

impl ScheduleStore for FileScheduleStore {
    fn load_all(&self) -> Result<Vec<Schedule>> {
        let _guard = self.lock.read();
        self.read_all()
    }

    fn upsert(&self, schedule: Schedule) -> Result<()> {
        let _guard = self.lock.write();
        let mut all = self.read_all()?;
        match all.iter_mut().find(|s| s.id == schedule.id) {
            Some(existing) => *existing = schedule,
            None => all.push(schedule),
        }
        self.write_all(&all)
    }

    fn get(&self, id: Uuid) -> Result<Option<Schedule>> {
        let _guard = self.lock.read();
        Ok(self.read_all()?.into_iter().find(|s| s.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn schedule() -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            name: "hourly".into(),
            pipeline_ids: vec![Uuid::new_v4()],
            cron_expression: "0 * * * *".into(),
            timezone: "UTC".into(),
            enabled: true,
            last_fired_at: None,
            next_fire_at: None,
        }
    }

    #[test]
    fn in_memory_round_trips() {
        let store = InMemoryScheduleStore::new();
        let s = schedule();
        store.upsert(s.clone()).unwrap();
        assert_eq!(store.get(s.id).unwrap().unwrap().name, "hourly");
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn file_store_persists_last_fired_at_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.json");

        let mut s = schedule();
        {
            let store = FileScheduleStore::new(&path);
            store.upsert(s.clone()).unwrap();
        }

        s.last_fired_at = Some(Utc::now());
        {
            let store = FileScheduleStore::new(&path);
            store.upsert(s.clone()).unwrap();
        }

        let reopened = FileScheduleStore::new(&path);
        let loaded = reopened.get(s.id).unwrap().unwrap();
        assert!(loaded.last_fired_at.is_some());
    }
}
