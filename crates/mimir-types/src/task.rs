//! Queue entry data model (§3 "WorkTask", §4.E, §6 "Work-task submission").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::ConfigValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkTaskType {
    PipelineExecution,
    MlTraining,
    MlInference,
    DigitalTwinUpdate,
}

/// Forward-only status. Order matches §3's invariant: `queued -> (scheduled
/// ->) executing -> (completed | failed | timeout | cancelled)`. Once a
/// terminal variant is reached the record is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Scheduled,
    Executing,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl TaskStatus {
    /// Terminal statuses never transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::Timeout
        )
    }

    /// Rank used to enforce forward-only transitions. Terminal states share
    /// the top rank since the graph converges to any one of them, not a
    /// linear chain past `executing`.
    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Queued => 0,
            TaskStatus::Scheduled => 1,
            TaskStatus::Executing => 2,
            TaskStatus::Completed
            | TaskStatus::Failed
            | TaskStatus::Cancelled
            | TaskStatus::Timeout => 3,
        }
    }

    /// Is `self -> next` a legal forward transition per §3's status graph?
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() > self.rank() || (self.rank() == next.rank() && *self != next && !self.is_terminal())
    }
}

/// Pipeline reference plus the trigger parameters a worker passes to the
/// engine context's `_parameters` namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub pipeline_id: Uuid,
    #[serde(default)]
    pub parameters: std::collections::HashMap<String, ConfigValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub memory_mb: Option<u64>,
    #[serde(default)]
    pub gpu: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataAccess {
    #[serde(default)]
    pub input_datasets: Vec<String>,
    #[serde(default)]
    pub output_location: Option<String>,
    #[serde(default)]
    pub credential_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkTask {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub task_type: WorkTaskType,
    pub status: TaskStatus,
    pub priority: u32,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub project_id: String,
    pub task_spec: TaskSpec,
    #[serde(default)]
    pub resource_requirements: ResourceRequirements,
    #[serde(default)]
    pub data_access: DataAccess,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl WorkTask {
    pub fn new(
        task_type: WorkTaskType,
        priority: u32,
        project_id: impl Into<String>,
        task_spec: TaskSpec,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type,
            status: TaskStatus::Queued,
            priority,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
            project_id: project_id.into(),
            task_spec,
            resource_requirements: ResourceRequirements::default(),
            data_access: DataAccess::default(),
            error_message: None,
        }
    }

    /// The queue's priority score: lower dequeues first (§4.E).
    pub fn score(&self) -> f64 {
        self.submitted_at.timestamp() as f64 / (self.priority as f64 + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TaskSpec {
        TaskSpec {
            pipeline_id: Uuid::new_v4(),
            parameters: Default::default(),
        }
    }

    #[test]
    fn forward_transitions_are_legal() {
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Scheduled));
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Executing));
        assert!(TaskStatus::Executing.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn backward_transitions_are_illegal() {
        assert!(!TaskStatus::Executing.can_transition_to(TaskStatus::Queued));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Executing));
    }

    #[test]
    fn terminal_states_are_immutable() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn higher_priority_scores_lower_at_same_submission_time() {
        let mut low = WorkTask::new(WorkTaskType::PipelineExecution, 1, "p", spec());
        let mut high = WorkTask::new(WorkTaskType::PipelineExecution, 2, "p", spec());
        low.submitted_at = DateTime::from_timestamp(100, 0).unwrap();
        high.submitted_at = DateTime::from_timestamp(100, 0).unwrap();
        assert!(high.score() < low.score());
    }
}
