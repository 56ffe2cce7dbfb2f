//! Shared data model for the Mimir orchestration core.
//!
//! Every other crate in the workspace (`mimir-context`, `mimir-plugin`,
//! `mimir-pipeline`, `mimir-scheduler`, `mimir-queue`, `mimir-worker`) builds
//! on these types instead of redefining them, so a `PipelineDefinition` or a
//! `WorkTask` means the same thing everywhere it crosses a crate boundary.

mod envelope;
mod pipeline;
mod plugin;
mod schedule;
mod task;
mod value;

pub use envelope::{ErrorCode, ErrorEnvelope};
pub use pipeline::{
    ExecutionStatus, PipelineDefinition, PipelineExecution, PipelineMetadata, PipelineType,
    StepDefinition, TriggerType,
};
pub use plugin::{PluginCategory, PluginDescriptor};
pub use schedule::Schedule;
pub use task::{DataAccess, ResourceRequirements, TaskSpec, TaskStatus, WorkTask, WorkTaskType};
pub use value::{is_truthy_str, ConfigValue};
