//! Dispatch seam for non-pipeline task types (§4.F "Others: invoke the
//! corresponding handler (out of scope here)").

use async_trait::async_trait;
use mimir_types::{WorkTask, WorkTaskType};

use crate::error::{Result, WorkerError};

/// A handler for one `WorkTaskType` other than `pipeline_execution`, which
/// the worker dispatches natively. `ml_training`, `ml_inference`, and
/// `digital_twin_update` have no implementation in this crate; registering
/// no handler for them means the worker fails such tasks with
/// `UnhandledTaskType` rather than silently dropping them.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    fn task_type(&self) -> WorkTaskType;
    async fn handle(&self, task: &WorkTask) -> Result<()>;
}

pub struct UnimplementedHandler(pub WorkTaskType);

#[async_trait]
impl TaskHandler for UnimplementedHandler {
    fn task_type(&self) -> WorkTaskType {
        self.0
    }

    async fn handle(&self, _task: &WorkTask) -> Result<()> {
        Err(WorkerError::UnhandledTaskType(format!("{:?}", self.0)))
    }
}
