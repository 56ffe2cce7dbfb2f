//! Priority FIFO work-task queue (§4.E "Data model in the queue",
//! "Operations", "Consistency", "Failure handling").
//!
//! The backing store here is a single-process `parking_lot::Mutex`, which
//! spec.md §4.E explicitly allows when no atomic-scored-set store is
//! available, provided it's documented: this is that documentation.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mimir_types::{TaskStatus, WorkTask};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{QueueError, Result};

/// Default time a terminal-status record is retained before the reaper's
/// sibling sweep (`sweep_expired`) evicts it (§4.E "bounded TTL (recommended
/// 24 hours)").
pub const DEFAULT_RECORD_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Ordering key for the priority set: lower sorts first. `f64` doesn't
/// implement `Ord`, so we carry the bits of a monotonic mapping alongside a
/// tie-breaking sequence number to preserve FIFO order among equal scores
/// (§4.E "among equal priority, FIFO by submission time is preserved").
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScoreKey(f64, u64);

impl Eq for ScoreKey {}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .expect("scores are never NaN")
            .then_with(|| self.1.cmp(&other.1))
    }
}

struct Entry {
    task: WorkTask,
    terminal_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, Entry>,
    ordered: BTreeMap<ScoreKey, Uuid>,
    sequence: u64,
}

pub struct Queue {
    inner: Mutex<Inner>,
    record_ttl: Duration,
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_RECORD_TTL)
    }

    pub fn with_ttl(record_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            record_ttl,
        }
    }

    /// Fails if the task id already exists (§4.E "enqueue").
    pub fn enqueue(&self, task: WorkTask) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.records.contains_key(&task.id) {
            return Err(QueueError::DuplicateTask(task.id));
        }
        inner.sequence += 1;
        let score_key = ScoreKey(task.score(), inner.sequence);
        let id = task.id;
        inner.ordered.insert(score_key, id);
        inner.records.insert(id, Entry { task, terminal_at: None });
        debug!(task = %id, "enqueued");
        Ok(())
    }

    /// Atomically pops the lowest-score id. A task whose record has expired
    /// is discarded and the next candidate is tried (§4.E "Failure
    /// handling": "dropped silently at dequeue time and logged").
    pub fn dequeue(&self) -> Option<WorkTask> {
        let mut inner = self.inner.lock();
        loop {
            let (&score_key, &id) = inner.ordered.iter().next()?;
            inner.ordered.remove(&score_key);
            match inner.records.get(&id) {
                Some(entry) => {
                    let task = entry.task.clone();
                    return Some(task);
                }
                None => {
                    warn!(task = %id, "dequeued id with no backing record, discarding");
                    continue;
                }
            }
        }
    }

    pub fn get_task(&self, id: Uuid) -> Option<WorkTask> {
        self.inner.lock().records.get(&id).map(|e| e.task.clone())
    }

    /// Only legal if `current.can_transition_to(new_status)`; stamps
    /// `started_at`/`completed_at` as appropriate (§4.E "updateStatus").
    pub fn update_status(&self, id: Uuid, new_status: TaskStatus, error_message: Option<String>) -> Result<()> {
        let mut inner = self.inner.lock();
        let entry = inner.records.get_mut(&id).ok_or(QueueError::NotFound(id))?;
        let current = entry.task.status;
        if !current.can_transition_to(new_status) {
            return Err(QueueError::IllegalTransition {
                id,
                from: current,
                to: new_status,
            });
        }

        entry.task.status = new_status;
        if new_status == TaskStatus::Executing {
            entry.task.started_at = Some(Utc::now());
        }
        if new_status.is_terminal() {
            let now = Utc::now();
            entry.task.completed_at = Some(now);
            entry.terminal_at = Some(now);
        }
        if error_message.is_some() {
            entry.task.error_message = error_message;
        }
        Ok(())
    }

    /// Since the priority set no longer holds dequeued ids, this reports
    /// the count of tasks still pending pickup (§4.E "queueLength").
    pub fn queue_length(&self) -> usize {
        self.inner.lock().ordered.len()
    }

    /// Scan for queued tasks at or above `min_priority` (§4.E
    /// "highPriorityTasks", used by the scaler).
    pub fn high_priority_tasks(&self, min_priority: u32) -> Vec<WorkTask> {
        self.inner
            .lock()
            .records
            .values()
            .filter(|e| e.task.status == TaskStatus::Queued && e.task.priority >= min_priority)
            .map(|e| e.task.clone())
            .collect()
    }

    /// Promote tasks stuck in `executing` past `timeout` to `failed`
    /// (§4.E "Failure handling": "a reaper SHOULD promote such tasks").
    pub fn reap_stale(&self, timeout: Duration) -> Vec<Uuid> {
        let mut inner = self.inner.lock();
        let now = Utc::now();
        let mut reaped = Vec::new();
        for entry in inner.records.values_mut() {
            if entry.task.status != TaskStatus::Executing {
                continue;
            }
            let Some(started_at) = entry.task.started_at else {
                continue;
            };
            let elapsed = now.signed_duration_since(started_at);
            if elapsed.to_std().unwrap_or_default() >= timeout {
                entry.task.status = TaskStatus::Failed;
                entry.task.completed_at = Some(now);
                entry.task.error_message = Some("stale execution reaped".to_string());
                entry.terminal_at = Some(now);
                reaped.push(entry.task.id);
            }
        }
        reaped
    }

    /// Evict terminal records past the TTL (§4.E "bounded TTL").
    pub fn sweep_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let now = Utc::now();
        let ttl = self.record_ttl;
        let expired: Vec<Uuid> = inner
            .records
            .iter()
            .filter_map(|(id, e)| match e.terminal_at {
                Some(t) if now.signed_duration_since(t).to_std().unwrap_or_default() >= ttl => Some(*id),
                _ => None,
            })
            .collect();
        for id in &expired {
            inner.records.remove(id);
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimir_types::{TaskSpec, WorkTaskType};

    fn task(priority: u32) -> WorkTask {
        WorkTask::new(
            WorkTaskType::PipelineExecution,
            priority,
            "proj",
            TaskSpec {
                pipeline_id: Uuid::new_v4(),
                parameters: Default::default(),
            },
        )
    }

    #[test]
    fn enqueue_rejects_duplicate_ids() {
        let q = Queue::new();
        let t = task(1);
        q.enqueue(t.clone()).unwrap();
        assert!(q.enqueue(t).is_err());
    }

    #[test]
    fn dequeue_is_fifo_within_equal_priority() {
        let q = Queue::new();
        let mut t1 = task(1);
        let mut t2 = task(1);
        let mut t3 = task(1);
        t1.submitted_at = DateTime::from_timestamp(100, 0).unwrap();
        t2.submitted_at = DateTime::from_timestamp(100, 0).unwrap();
        t3.submitted_at = DateTime::from_timestamp(100, 0).unwrap();
        q.enqueue(t1.clone()).unwrap();
        q.enqueue(t2.clone()).unwrap();
        q.enqueue(t3.clone()).unwrap();

        assert_eq!(q.dequeue().unwrap().id, t1.id);
        assert_eq!(q.dequeue().unwrap().id, t2.id);
        assert_eq!(q.dequeue().unwrap().id, t3.id);
    }

    #[test]
    fn higher_priority_dequeues_first() {
        let q = Queue::new();
        let low = task(1);
        let high = task(10);
        q.enqueue(low.clone()).unwrap();
        q.enqueue(high.clone()).unwrap();
        assert_eq!(q.dequeue().unwrap().id, high.id);
        assert_eq!(q.dequeue().unwrap().id, low.id);
    }

    #[test]
    fn dequeue_discards_expired_record_and_continues() {
        let q = Queue::new();
        let t = task(1);
        q.enqueue(t.clone()).unwrap();
        q.inner.lock().records.remove(&t.id);
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn update_status_enforces_forward_only_transitions() {
        let q = Queue::new();
        let t = task(1);
        q.enqueue(t.clone()).unwrap();
        q.update_status(t.id, TaskStatus::Executing, None).unwrap();
        assert!(q.get_task(t.id).unwrap().started_at.is_some());
        assert!(q.update_status(t.id, TaskStatus::Queued, None).is_err());
        q.update_status(t.id, TaskStatus::Completed, None).unwrap();
        assert!(q.update_status(t.id, TaskStatus::Failed, None).is_err());
    }

    #[test]
    fn queue_length_excludes_dequeued_tasks() {
        let q = Queue::new();
        q.enqueue(task(1)).unwrap();
        q.enqueue(task(1)).unwrap();
        assert_eq!(q.queue_length(), 2);
        q.dequeue();
        assert_eq!(q.queue_length(), 1);
    }

    #[test]
    fn high_priority_tasks_filters_queued_and_priority() {
        let q = Queue::new();
        let low = task(1);
        let high = task(10);
        q.enqueue(low).unwrap();
        q.enqueue(high.clone()).unwrap();
        let found = q.high_priority_tasks(5);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, high.id);
    }

    #[test]
    fn reaper_promotes_stale_executing_tasks_to_failed() {
        let q = Queue::new();
        let t = task(1);
        q.enqueue(t.clone()).unwrap();
        q.update_status(t.id, TaskStatus::Executing, None).unwrap();
        {
            let mut inner = q.inner.lock();
            let entry = inner.records.get_mut(&t.id).unwrap();
            entry.task.started_at = Some(Utc::now() - chrono::Duration::hours(1));
        }
        let reaped = q.reap_stale(Duration::from_secs(60));
        assert_eq!(reaped, vec![t.id]);
        assert_eq!(q.get_task(t.id).unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn sweep_expired_evicts_old_terminal_records() {
        let q = Queue::with_ttl(Duration::from_secs(0));
        let t = task(1);
        q.enqueue(t.clone()).unwrap();
        q.update_status(t.id, TaskStatus::Executing, None).unwrap();
        q.update_status(t.id, TaskStatus::Completed, None).unwrap();
        let swept = q.sweep_expired();
        assert_eq!(swept, 1);
        assert!(q.get_task(t.id).is_none());
    }
}
