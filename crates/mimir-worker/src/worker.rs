//! Worker poll loop (§4.F "Worker loop", "Cancellation and timeout").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mimir_pipeline::{CancellationToken, PipelineEngine};
use mimir_types::{PipelineDefinition, TaskStatus, TriggerType, WorkTask, WorkTaskType};
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, WorkerError};
use crate::handler::TaskHandler;

/// Bounds for the jittered poll backoff when the queue is empty
/// (§4.F "sleep for a bounded backoff (e.g., 100ms-2s jittered)").
pub const MIN_POLL_BACKOFF: Duration = Duration::from_millis(100);
pub const MAX_POLL_BACKOFF: Duration = Duration::from_secs(2);

/// How often the cancellation watcher re-checks the queue's view of the
/// in-flight task's status (§4.F "if the queue reports status cancelled
/// during polling against the current task id").
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Supplies the pipeline definition a `pipeline_execution` task references.
/// `mimir-worker` has no storage of its own; the binary wires this to
/// whatever holds pipeline definitions (file store, database, ...).
pub trait PipelineSource: Send + Sync {
    fn get(&self, id: Uuid) -> Option<PipelineDefinition>;
}

pub struct Worker {
    queue: Arc<mimir_queue::Queue>,
    engine: Arc<PipelineEngine>,
    pipelines: Arc<dyn PipelineSource>,
    handlers: HashMap<WorkTaskType, Arc<dyn TaskHandler>>,
}

impl Worker {
    pub fn new(queue: Arc<mimir_queue::Queue>, engine: Arc<PipelineEngine>, pipelines: Arc<dyn PipelineSource>) -> Self {
        Self {
            queue,
            engine,
            pipelines,
            handlers: HashMap::new(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(handler.task_type(), handler);
        self
    }

    /// Runs forever: poll, process, sleep on an empty queue. Each call to
    /// [`Worker::poll_once`] is a unit of work a test can drive directly.
    pub async fn run(&self) -> ! {
        loop {
            match self.poll_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(jittered_backoff()).await,
                Err(e) => warn!(error = %e, "worker iteration failed"),
            }
        }
    }

    /// Dequeues and fully processes at most one task. Returns `Ok(false)`
    /// when the queue was empty (§4.F steps 1-7).
    pub async fn poll_once(&self) -> Result<bool> {
        let Some(task) = self.queue.dequeue() else {
            return Ok(false);
        };
        self.process(task).await?;
        Ok(true)
    }

    async fn process(&self, task: WorkTask) -> Result<()> {
        let id = task.id;
        self.queue.update_status(id, TaskStatus::Executing, None)?;
        info!(task = %id, task_type = ?task.task_type, "task started");

        let outcome = match task.task_type {
            WorkTaskType::PipelineExecution => self.run_pipeline(&task).await,
            other => match self.handlers.get(&other) {
                Some(handler) => handler.handle(&task).await,
                None => Err(WorkerError::UnhandledTaskType(format!("{other:?}"))),
            },
        };

        // A reaper may have already moved this task to `timeout` while we
        // were executing; the worker must not overwrite that terminal
        // status with a late completion write (§4.F "ceases further writes
        // for that task").
        if matches!(self.queue.get_task(id).map(|t| t.status), Some(TaskStatus::Timeout)) {
            debug!(task = %id, "task was reaped as timed out, discarding late result");
            return Ok(());
        }

        match outcome {
            Ok(()) => {
                self.queue.update_status(id, TaskStatus::Completed, None)?;
                info!(task = %id, "task completed");
            }
            Err(e) => {
                self.queue.update_status(id, TaskStatus::Failed, Some(e.to_string()))?;
                warn!(task = %id, error = %e, "task failed");
            }
        }
        Ok(())
    }

    async fn run_pipeline(&self, task: &WorkTask) -> Result<()> {
        let pipeline_id = task.task_spec.pipeline_id;
        let Some(pipeline) = self.pipelines.get(pipeline_id) else {
            return Err(WorkerError::UnhandledTaskType(format!(
                "pipeline '{pipeline_id}' not found"
            )));
        };

        let cancellation = CancellationToken::new();
        let watcher_queue = self.queue.clone();
        let watcher_token = cancellation.clone();
        let task_id = task.id;
        let watcher = tokio::spawn(async move {
            loop {
                tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
                match watcher_queue.get_task(task_id).map(|t| t.status) {
                    Some(TaskStatus::Cancelled) => {
                        watcher_token.cancel();
                        break;
                    }
                    Some(TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Timeout) | None => break,
                    _ => {}
                }
            }
        });

        let exec = self
            .engine
            .execute_cancellable(
                &pipeline,
                TriggerType::Pipeline,
                "worker",
                task.task_spec.parameters.clone(),
                Some(&cancellation),
            )
            .await;
        watcher.abort();

        if let Some(error) = exec.error {
            return Err(WorkerError::PipelineFailed(error));
        }
        Ok(())
    }
}

fn jittered_backoff() -> Duration {
    let min = MIN_POLL_BACKOFF.as_millis() as u64;
    let max = MAX_POLL_BACKOFF.as_millis() as u64;
    let millis = rand::rng().random_range(min..=max);
    Duration::from_millis(millis)
}
