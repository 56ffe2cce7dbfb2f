//! `mimir run` - execute a single pipeline file once and print the result.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::style;
use mimir_pipeline::{EngineConfig, PipelineEngine};
use mimir_plugin::{DefaultPlugin, Registry};
use mimir_types::TriggerType;

use super::Context;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the pipeline TOML file.
    pub pipeline: PathBuf,

    /// Trigger parameters as `key=value` pairs, placed under `_parameters`.
    #[arg(short = 'p', long = "param")]
    pub params: Vec<String>,
}

pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let definition = mimir_pipeline::from_file(&args.pipeline)?;

    let mut parameters = HashMap::new();
    for pair in &args.params {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid --param '{pair}', expected key=value"))?;
        parameters.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }

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

    let execution = engine
        .execute(&definition, TriggerType::Manual, "cli", parameters)
        .await;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&execution)?);
    } else {
        println!("{} {}", style("pipeline:").dim(), definition.name);
        println!("{} {:?}", style("status:").dim(), execution.status);
        if let Some(error) = &execution.error {
            println!("{} {}", style("error:").red(), error);
        }
    }

    Ok(())
}
