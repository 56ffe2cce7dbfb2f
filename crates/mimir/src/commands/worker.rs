//! `mimir worker` - drain a one-shot batch of tasks against an in-process
//! queue (§4.F). The queue has no cross-process persistence (documented in
//! `mimir-queue`), so this is for local batch processing; `serve` is the
//! long-running daemon shape.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::style;
use mimir_pipeline::PipelineEngine;
use mimir_plugin::{DefaultPlugin, Registry};
use mimir_queue::Queue;
use mimir_types::WorkTask;
use mimir_worker::Worker;

use super::Context;
use crate::pipelines::PipelineSet;

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// JSON file containing an array of `WorkTask` records to enqueue.
    pub tasks: PathBuf,

    /// Directory of pipeline TOML files referenced by the tasks.
    #[arg(long, default_value = "pipelines")]
    pub pipelines_dir: PathBuf,
}

pub async fn run(args: WorkerArgs, _ctx: &Context) -> Result<()> {
    let text = std::fs::read_to_string(&args.tasks)?;
    let tasks: Vec<WorkTask> = serde_json::from_str(&text)?;

    let queue = Arc::new(Queue::new());
    for task in tasks {
        queue.enqueue(task)?;
    }

    let pipeline_set = Arc::new(PipelineSet::load_dir(&args.pipelines_dir)?);
    let registry = Registry::new();
    registry.register(Arc::new(DefaultPlugin::new()))?;
    let engine = Arc::new(PipelineEngine::new(Arc::new(registry)));

    let worker = Worker::new(queue.clone(), engine, pipeline_set);

    let mut processed = 0usize;
    while worker.poll_once().await? {
        processed += 1;
    }

    println!("{} {processed}", style("processed:").green());
    Ok(())
}
