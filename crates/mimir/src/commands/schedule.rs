//! `mimir schedule` - register a cron schedule or evaluate the schedule
//! store once, executing whatever pipelines are due (§4.D).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use console::style;
use mimir_pipeline::{EngineConfig, PipelineEngine};
use mimir_plugin::{DefaultPlugin, Registry};
use mimir_scheduler::{FileScheduleStore, ScheduleStore, Scheduler};
use mimir_types::{Schedule, TriggerType};
use uuid::Uuid;

use super::Context;
use crate::pipelines::PipelineSet;

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Path to the JSON file persisting schedule state.
    #[arg(long, default_value = "schedules.json")]
    pub store: PathBuf,

    #[command(subcommand)]
    pub command: ScheduleCommand,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// Register a new schedule.
    Add {
        name: String,
        /// 5-field cron expression.
        cron: String,
        /// Pipeline names or ids this schedule fires.
        #[arg(required = true)]
        pipelines: Vec<String>,
        #[arg(long, default_value = "UTC")]
        timezone: String,
        /// Directory of pipeline TOML files, for resolving names to ids.
        #[arg(long, default_value = "pipelines")]
        pipelines_dir: PathBuf,
    },
    /// Evaluate the store against the current time and run whatever fired.
    Tick {
        /// Directory of pipeline TOML files to execute fired pipelines from.
        #[arg(long, default_value = "pipelines")]
        pipelines_dir: PathBuf,
    },
}

pub async fn run(args: ScheduleArgs, ctx: &Context) -> Result<()> {
    let store: Arc<dyn ScheduleStore> = Arc::new(FileScheduleStore::new(&args.store));
    let scheduler = Scheduler::new(store.clone());

    match args.command {
        ScheduleCommand::Add {
            name,
            cron,
            pipelines,
            timezone,
            pipelines_dir,
        } => {
            let pipeline_set = PipelineSet::load_dir(&pipelines_dir)?;
            let pipeline_ids = pipelines
                .iter()
                .map(|p| {
                    pipeline_set
                        .resolve_id(p)
                        .with_context(|| format!("unknown pipeline '{p}'"))
                })
                .collect::<Result<Vec<Uuid>>>()?;

            let schedule = Schedule {
                id: Uuid::new_v4(),
                name: name.clone(),
                pipeline_ids,
                cron_expression: cron,
                timezone,
                enabled: true,
                last_fired_at: None,
                next_fire_at: None,
            };
            scheduler.register(schedule, Utc::now())?;
            println!("{} {}", style("registered:").green(), name);
        }
        ScheduleCommand::Tick { pipelines_dir } => {
            let pipeline_set = PipelineSet::load_dir(&pipelines_dir)?;
            let due = scheduler.tick(Utc::now())?;

            let registry = Registry::new();
            registry.register(Arc::new(DefaultPlugin::new()))?;
            let engine = PipelineEngine::with_config(
                Arc::new(registry),
                EngineConfig {
                    max_context_bytes: ctx.settings.max_context_bytes,
                    step_budget_multiplier: ctx.settings.step_budget_multiplier,
                    ..EngineConfig::default()
                },
            );

            for due_schedule in &due {
                for pipeline_id in &due_schedule.pipeline_ids {
                    let Some(definition) = pipeline_set.get(*pipeline_id) else {
                        eprintln!("{} unknown pipeline id {pipeline_id}", style("warn:").yellow());
                        continue;
                    };
                    let execution = engine
                        .execute(definition, TriggerType::Scheduled, "scheduler", HashMap::new())
                        .await;
                    println!(
                        "{} {} -> {:?}",
                        style("fired:").green(),
                        definition.name,
                        execution.status
                    );
                }
            }

            if due.is_empty() {
                println!("{}", style("no schedules due").dim());
            }
        }
    }

    Ok(())
}
