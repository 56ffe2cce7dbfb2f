//! `mimir serve` - long-running daemon: ticks the scheduler, enqueues due
//! pipelines, and runs a pool of workers draining the same in-process
//! queue, until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::style;
use mimir_pipeline::PipelineEngine;
use mimir_plugin::{DefaultPlugin, Registry};
use mimir_queue::Queue;
use mimir_scheduler::{FileScheduleStore, ScheduleStore, Scheduler};
use mimir_types::{TaskSpec, WorkTask, WorkTaskType};
use mimir_worker::Worker;
use tracing::info;

use super::Context;
use crate::pipelines::PipelineSet;

/// How often the scheduler tick loop re-evaluates due schedules.
const TICK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = "schedules.json")]
    pub store: PathBuf,

    #[arg(long, default_value = "pipelines")]
    pub pipelines_dir: PathBuf,

    /// Number of worker tasks to run concurrently against the queue.
    #[arg(long, default_value_t = 2)]
    pub workers: usize,
}

pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let pipeline_set = Arc::new(PipelineSet::load_dir(&args.pipelines_dir)?);
    let queue = Arc::new(Queue::with_ttl(ctx.settings.queue_record_ttl));
    let schedule_store: Arc<dyn ScheduleStore> = Arc::new(FileScheduleStore::new(&args.store));
    let scheduler = Scheduler::new(schedule_store);

    let registry = Registry::new();
    registry.register(Arc::new(DefaultPlugin::new()))?;
    let engine = Arc::new(PipelineEngine::new(Arc::new(registry)));

    let mut worker_handles = Vec::new();
    for worker_id in 0..args.workers.max(1) {
        let worker = Worker::new(queue.clone(), engine.clone(), pipeline_set.clone());
        worker_handles.push(tokio::spawn(async move {
            info!(worker_id, "worker loop starting");
            worker.run().await
        }));
    }

    println!(
        "{} workers={} store={}",
        style("serving:").green(),
        args.workers,
        args.store.display()
    );

    loop {
        tokio::select! {
            _ = tokio::time::sleep(TICK_INTERVAL) => {
                let due = scheduler.tick(chrono::Utc::now())?;
                for fired in &due {
                    for pipeline_id in &fired.pipeline_ids {
                        let task = WorkTask::new(
                            WorkTaskType::PipelineExecution,
                            0,
                            "scheduler",
                            TaskSpec { pipeline_id: *pipeline_id, parameters: Default::default() },
                        );
                        queue.enqueue(task)?;
                    }
                }
                queue.reap_stale(ctx.settings.stale_execution_timeout);
                let _ = queue.sweep_expired();
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", style("shutting down").dim());
                break;
            }
        }
    }

    Ok(())
}
