//! `PipelineDefinition` / `StepDefinition` / `PipelineExecution` — the core
//! data model for spec.md §3, independent of how it was parsed (TOML, JSON,
//! or constructed in-memory by a caller).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::ErrorEnvelope;
use crate::value::ConfigValue;

/// One of the three pipeline categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineType {
    Ingestion,
    Processing,
    Output,
}

/// Tags, timestamps, and description carried alongside a pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineMetadata {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One entry in a pipeline's step sequence.
///
/// `plugin` is the composite `<category>.<name>` key the registry looks up,
/// or `default`/`builtin` for the built-in control-flow plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub plugin: String,
    pub action: String,
    #[serde(default)]
    pub config: HashMap<String, ConfigValue>,
    #[serde(default)]
    pub output: HashMap<String, String>,
}

/// An immutable, once-created pipeline definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub pipeline_type: PipelineType,
    pub steps: Vec<StepDefinition>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub metadata: PipelineMetadata,
}

fn default_enabled() -> bool {
    true
}

impl PipelineDefinition {
    /// Validate the structural invariants from spec.md §3/§8: at least one
    /// step, unique step names.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("pipeline name cannot be empty".into());
        }
        if self.steps.is_empty() {
            return Err("pipeline must have at least one step".into());
        }
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if step.name.is_empty() {
                return Err("step name cannot be empty".into());
            }
            if !seen.insert(step.name.as_str()) {
                return Err(format!("duplicate step name: {}", step.name));
            }
        }
        Ok(())
    }

    /// Index of a step by name, used by `goto` resolution.
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }
}

/// What caused a pipeline run to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
    Api,
    Pipeline,
}

/// Status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// A pipeline run: mutable while `status == Running`, immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineExecution {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub trigger_type: TriggerType,
    pub triggered_by: String,
    /// `{code, message, details?}` (§7) — the coded envelope callers match
    /// on, not a bare string.
    #[serde(default)]
    pub error: Option<ErrorEnvelope>,
    /// Snapshot of the final context, captured once at run end (spec.md §9:
    /// "persist only the final execution record", never intermediate
    /// context).
    #[serde(default)]
    pub final_context: Option<ConfigValue>,
}

impl PipelineExecution {
    pub fn new(pipeline_id: Uuid, trigger_type: TriggerType, triggered_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline_id,
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            trigger_type,
            triggered_by: triggered_by.into(),
            error: None,
            final_context: None,
        }
    }

    pub fn complete(&mut self, final_context: ConfigValue) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.final_context = Some(final_context);
    }

    pub fn fail(&mut self, error: impl Into<ErrorEnvelope>) {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    pub fn cancel(&mut self) {
        self.status = ExecutionStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str) -> StepDefinition {
        StepDefinition {
            name: name.into(),
            plugin: "default".into(),
            action: "noop".into(),
            config: HashMap::new(),
            output: HashMap::new(),
        }
    }

    #[test]
    fn validate_requires_at_least_one_step() {
        let def = PipelineDefinition {
            id: Uuid::new_v4(),
            name: "p".into(),
            pipeline_type: PipelineType::Processing,
            steps: vec![],
            enabled: true,
            metadata: PipelineMetadata::default(),
        };
        assert!(def.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_step_names() {
        let def = PipelineDefinition {
            id: Uuid::new_v4(),
            name: "p".into(),
            pipeline_type: PipelineType::Processing,
            steps: vec![step("a"), step("a")],
            enabled: true,
            metadata: PipelineMetadata::default(),
        };
        assert!(def.validate().is_err());
    }

    #[test]
    fn step_index_finds_by_name() {
        let def = PipelineDefinition {
            id: Uuid::new_v4(),
            name: "p".into(),
            pipeline_type: PipelineType::Processing,
            steps: vec![step("a"), step("b")],
            enabled: true,
            metadata: PipelineMetadata::default(),
        };
        assert_eq!(def.step_index("b"), Some(1));
        assert_eq!(def.step_index("missing"), None);
    }

    #[test]
    fn execution_lifecycle() {
        let mut exec = PipelineExecution::new(Uuid::new_v4(), TriggerType::Manual, "test");
        assert_eq!(exec.status, ExecutionStatus::Running);
        exec.complete(serde_json::json!({"ok": true}));
        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert!(exec.completed_at.is_some());
    }
}
