//! The step loop (§4.C): walks `pipeline.steps`, dispatching each through
//! the registry, mediating the context, and interpreting `goto`.

use std::collections::HashMap;
use std::sync::Arc;

use mimir_context::{ContextResolver, PipelineContext, Strictness, DEFAULT_MAX_CONTEXT_BYTES};
use mimir_plugin::Registry;
use mimir_types::{ConfigValue, PipelineDefinition, PipelineExecution, TriggerType};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::PipelineError;

/// Reserved output key a plugin returns to request a jump (§4.C step 7).
const GOTO_KEY: &str = "goto";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_context_bytes: usize,
    /// Per-run step-visit cap, as a multiple of the static step count
    /// (§4.C "Loop-protection open question", recommended 10x).
    pub step_budget_multiplier: usize,
    pub strictness: Strictness,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_context_bytes: DEFAULT_MAX_CONTEXT_BYTES,
            step_budget_multiplier: 10,
            strictness: Strictness::Permissive,
        }
    }
}

pub struct PipelineEngine {
    registry: Arc<Registry>,
    config: EngineConfig,
}

impl PipelineEngine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(registry: Arc<Registry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// `execute(pipeline, triggerParameters) -> execution` (§4.C). Always
    /// returns a terminal (or cancelled) execution record; step-level
    /// errors are captured into it rather than propagated, matching
    /// "errors abort the run immediately" (§7) without unwinding the
    /// caller.
    pub async fn execute(
        &self,
        pipeline: &PipelineDefinition,
        trigger_type: TriggerType,
        triggered_by: &str,
        parameters: HashMap<String, ConfigValue>,
    ) -> PipelineExecution {
        self.execute_cancellable(pipeline, trigger_type, triggered_by, parameters, None)
            .await
    }

    pub async fn execute_cancellable(
        &self,
        pipeline: &PipelineDefinition,
        trigger_type: TriggerType,
        triggered_by: &str,
        parameters: HashMap<String, ConfigValue>,
        cancellation: Option<&CancellationToken>,
    ) -> PipelineExecution {
        let mut exec = PipelineExecution::new(pipeline.id, trigger_type, triggered_by);
        let mut context = PipelineContext::new(self.config.max_context_bytes);

        for (key, value) in parameters {
            if let Err(e) = context.set_parameter(&key, value) {
                exec.fail(PipelineError::Context(e));
                return exec;
            }
        }

        let budget = self.config.step_budget_multiplier * pipeline.steps.len().max(1);
        let mut index = 0usize;
        let mut visits = 0usize;

        info!(pipeline = %pipeline.name, execution = %exec.id, "pipeline run started");

        loop {
            if let Some(token) = cancellation {
                if token.is_cancelled() {
                    warn!(pipeline = %pipeline.name, execution = %exec.id, "run cancelled at step boundary");
                    exec.cancel();
                    break;
                }
            }

            if index >= pipeline.steps.len() {
                exec.complete(context.snapshot());
                info!(pipeline = %pipeline.name, execution = %exec.id, "pipeline run completed");
                break;
            }

            if visits >= budget {
                exec.fail(PipelineError::StepBudgetExceeded { budget });
                warn!(pipeline = %pipeline.name, execution = %exec.id, budget, "step budget exceeded");
                break;
            }
            visits += 1;

            let step = &pipeline.steps[index];
            debug!(pipeline = %pipeline.name, step = %step.name, visits, "dispatching step");

            let plugin = match self.registry.lookup(&step.plugin) {
                Ok(p) => p,
                Err(_) => {
                    exec.fail(PipelineError::PluginNotFound {
                        step: step.name.clone(),
                        plugin: step.plugin.clone(),
                    });
                    break;
                }
            };

            let mut resolved_config = HashMap::new();
            let mut resolve_error = None;
            {
                let resolver = ContextResolver::new(&context, self.config.strictness);
                for (key, value) in &step.config {
                    match resolver.resolve_value(value) {
                        Ok(resolved) => {
                            resolved_config.insert(key.clone(), resolved);
                        }
                        Err(e) => {
                            resolve_error = Some(e);
                            break;
                        }
                    }
                }
            }
            if let Some(e) = resolve_error {
                exec.fail(PipelineError::Context(e));
                break;
            }

            let outputs = match plugin.execute(&step.action, &resolved_config, &mut context).await {
                Ok(outputs) => outputs,
                Err(e) => {
                    exec.fail(PipelineError::Plugin(e));
                    break;
                }
            };

            let mut goto_target = None;
            let mut write_error = None;
            for (key, value) in &outputs {
                if key == GOTO_KEY {
                    if let Some(target) = value.as_str() {
                        goto_target = Some(target.to_string());
                    }
                }
                if let Err(e) = context.set_step_data(&step.name, key, value.clone()) {
                    write_error = Some(e);
                    break;
                }
            }
            if let Some(e) = write_error {
                exec.fail(PipelineError::Context(e));
                break;
            }

            let mut output_error = None;
            for (out_key, template) in &step.output {
                let resolver = ContextResolver::new(&context, self.config.strictness).with_local(&outputs);
                match resolver.resolve_string(template) {
                    Ok(resolved) => {
                        if let Err(e) = context.set_step_data(&step.name, out_key, resolved) {
                            output_error = Some(e);
                            break;
                        }
                    }
                    Err(e) => {
                        output_error = Some(e);
                        break;
                    }
                }
            }
            if let Some(e) = output_error {
                exec.fail(PipelineError::Context(e));
                break;
            }

            if let Some(target) = goto_target {
                match pipeline.step_index(&target) {
                    Some(idx) => {
                        debug!(pipeline = %pipeline.name, from = %step.name, to = %target, "goto");
                        index = idx;
                        continue;
                    }
                    None => {
                        exec.fail(PipelineError::GotoTargetNotFound {
                            step: step.name.clone(),
                            target,
                        });
                        break;
                    }
                }
            }

            index += 1;
        }

        exec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimir_plugin::DefaultPlugin;
    use mimir_types::{PipelineMetadata, PipelineType, StepDefinition};
    use serde_json::json;
    use uuid::Uuid;

    fn registry() -> Arc<Registry> {
        let registry = Registry::new();
        registry.register(Arc::new(DefaultPlugin::new())).unwrap();
        Arc::new(registry)
    }

    fn step(name: &str, action: &str, config: &[(&str, ConfigValue)], output: &[(&str, &str)]) -> StepDefinition {
        StepDefinition {
            name: name.to_string(),
            plugin: "default".to_string(),
            action: action.to_string(),
            config: config.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            output: output.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    fn pipeline(steps: Vec<StepDefinition>) -> PipelineDefinition {
        PipelineDefinition {
            id: Uuid::new_v4(),
            name: "test".into(),
            pipeline_type: PipelineType::Processing,
            steps,
            enabled: true,
            metadata: PipelineMetadata::default(),
        }
    }

    #[tokio::test]
    async fn conditional_branching_scenario() {
        let def = pipeline(vec![
            step("A", "parse_json", &[("data", json!(r#"{"id":1}"#))], &[]),
            step(
                "B",
                "if_else",
                &[
                    ("condition", json!("{{context.A.parsed.id}}")),
                    ("if_true", json!("X")),
                    ("if_false", json!("Y")),
                ],
                &[],
            ),
        ]);
        let engine = PipelineEngine::new(registry());
        let exec = engine
            .execute(&def, TriggerType::Manual, "test", HashMap::new())
            .await;
        assert_eq!(exec.status, mimir_types::ExecutionStatus::Completed);
        let snapshot = exec.final_context.unwrap();
        assert_eq!(snapshot["B"]["result"], json!("X"));
    }

    #[tokio::test]
    async fn goto_loop_is_bounded_by_step_budget() {
        let def = pipeline(vec![
            step("A", "set_context", &[("key", json!("n")), ("value", json!("0")), ("step", json!("_global"))], &[]),
            step("B", "goto", &[("target", json!("A"))], &[]),
        ]);
        let engine = PipelineEngine::with_config(
            registry(),
            EngineConfig {
                step_budget_multiplier: 10,
                ..EngineConfig::default()
            },
        );
        let exec = engine
            .execute(&def, TriggerType::Manual, "test", HashMap::new())
            .await;
        assert_eq!(exec.status, mimir_types::ExecutionStatus::Failed);
        let error = exec.error.unwrap();
        assert_eq!(error.code, mimir_types::ErrorCode::StepBudgetExceeded);
        assert!(error.message.contains("budget"));
    }

    #[tokio::test]
    async fn unknown_plugin_fails_with_plugin_not_found() {
        let def = pipeline(vec![step("A", "noop", &[], &[])]
            .into_iter()
            .map(|mut s| {
                s.plugin = "Input.missing".to_string();
                s
            })
            .collect());
        let engine = PipelineEngine::new(registry());
        let exec = engine
            .execute(&def, TriggerType::Manual, "test", HashMap::new())
            .await;
        assert_eq!(exec.status, mimir_types::ExecutionStatus::Failed);
        let error = exec.error.unwrap();
        assert_eq!(error.code, mimir_types::ErrorCode::PluginNotFound);
        assert!(error.message.contains("not found"));
    }

    #[tokio::test]
    async fn single_step_pipeline_completes_with_plugin_outputs() {
        let def = pipeline(vec![step("A", "parse_json", &[("data", json!(r#"{"x":1}"#))], &[])]);
        let engine = PipelineEngine::new(registry());
        let exec = engine
            .execute(&def, TriggerType::Manual, "test", HashMap::new())
            .await;
        assert_eq!(exec.status, mimir_types::ExecutionStatus::Completed);
        let snapshot = exec.final_context.unwrap();
        assert_eq!(snapshot["A"]["parsed"], json!({"x": 1}));
    }

    #[tokio::test]
    async fn cancellation_is_observed_at_step_boundary() {
        let def = pipeline(vec![
            step("A", "parse_json", &[("data", json!(r#"{"x":1}"#))], &[]),
            step("B", "parse_json", &[("data", json!(r#"{"x":2}"#))], &[]),
        ]);
        let engine = PipelineEngine::new(registry());
        let token = CancellationToken::new();
        token.cancel();
        let exec = engine
            .execute_cancellable(&def, TriggerType::Manual, "test", HashMap::new(), Some(&token))
            .await;
        assert_eq!(exec.status, mimir_types::ExecutionStatus::Cancelled);
    }
}
