//! TOML pipeline file parsing (§6 "Pipeline definition (declarative)").
//!
//! `[pipeline]` + `[[pipeline.steps]]` tables, matching the
//! `name`/`type`/`steps` schema; step tables take `name`/`plugin`/`action`
//! plus optional `config`/`output`.

use std::collections::HashMap;
use std::path::Path;

use mimir_types::{PipelineDefinition, PipelineMetadata, PipelineType, StepDefinition};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{PipelineError, Result};

#[derive(Debug, Deserialize)]
struct PipelineFile {
    pipeline: RawPipeline,
}

#[derive(Debug, Deserialize)]
struct RawPipeline {
    name: String,
    #[serde(rename = "type")]
    pipeline_type: PipelineType,
    #[serde(default)]
    steps: Vec<RawStep>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawStep {
    name: String,
    plugin: String,
    action: String,
    #[serde(default)]
    config: HashMap<String, mimir_types::ConfigValue>,
    #[serde(default)]
    output: HashMap<String, String>,
}

/// Parse a pipeline definition from a TOML document, assigning it a fresh
/// id, and validate it (§3 invariants: ≥1 step, unique step names).
pub fn from_toml(text: &str) -> Result<PipelineDefinition> {
    let file: PipelineFile = toml::from_str(text)?;
    let def = PipelineDefinition {
        id: Uuid::new_v4(),
        name: file.pipeline.name,
        pipeline_type: file.pipeline.pipeline_type,
        steps: file
            .pipeline
            .steps
            .into_iter()
            .map(|s| StepDefinition {
                name: s.name,
                plugin: s.plugin,
                action: s.action,
                config: s.config,
                output: s.output,
            })
            .collect(),
        enabled: file.pipeline.enabled,
        metadata: PipelineMetadata {
            description: file.pipeline.description,
            tags: file.pipeline.tags,
            created_at: None,
            updated_at: None,
        },
    };
    def.validate().map_err(PipelineError::InvalidDefinition)?;
    Ok(def)
}

/// Parse a pipeline definition from a TOML file on disk.
pub fn from_file(path: impl AsRef<Path>) -> Result<PipelineDefinition> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        PipelineError::InvalidDefinition(format!("cannot read {}: {e}", path.as_ref().display()))
    })?;
    from_toml(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINEAR: &str = r#"
        [pipeline]
        name = "ingest"
        type = "ingestion"

        [[pipeline.steps]]
        name = "A"
        plugin = "default"
        action = "http_request"
        config = { url = "https://svc/x" }

        [[pipeline.steps]]
        name = "B"
        plugin = "default"
        action = "parse_json"
        config = { data = "{{context.A.response.body}}" }
    "#;

    #[test]
    fn parses_name_type_and_steps() {
        let def = from_toml(LINEAR).unwrap();
        assert_eq!(def.name, "ingest");
        assert_eq!(def.pipeline_type, PipelineType::Ingestion);
        assert_eq!(def.steps.len(), 2);
        assert_eq!(def.steps[1].name, "B");
    }

    #[test]
    fn rejects_zero_step_pipeline() {
        let toml = r#"
            [pipeline]
            name = "empty"
            type = "processing"
        "#;
        assert!(from_toml(toml).is_err());
    }

    #[test]
    fn rejects_duplicate_step_names() {
        let toml = r#"
            [pipeline]
            name = "dup"
            type = "processing"

            [[pipeline.steps]]
            name = "A"
            plugin = "default"
            action = "parse_json"

            [[pipeline.steps]]
            name = "A"
            plugin = "default"
            action = "parse_json"
        "#;
        assert!(from_toml(toml).is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(from_toml("not valid toml [[[").is_err());
    }
}
