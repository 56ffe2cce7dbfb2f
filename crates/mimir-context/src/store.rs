//! The bounded, namespaced per-run context store (§3 "PipelineContext",
//! §4.B).

use crate::error::{ContextError, Result};
use mimir_types::ConfigValue;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default bound on total context size: 10 MiB (§3, §4.B).
pub const DEFAULT_MAX_CONTEXT_BYTES: usize = 10 * 1024 * 1024;

/// Reserved namespace for trigger-supplied parameters (§3).
pub const PARAMETERS_NAMESPACE: &str = "_parameters";

/// `context.steps[stepName][key] = value`, plus the reserved `_parameters`
/// namespace, under one running byte-size bound. Created at run start,
/// dropped at run end; never shared between runs (§3 lifecycle).
#[derive(Debug, Clone)]
pub struct PipelineContext {
    namespaces: HashMap<String, ConfigValue>,
    size: usize,
    max_size: usize,
}

impl PipelineContext {
    pub fn new(max_size: usize) -> Self {
        Self {
            namespaces: HashMap::new(),
            size: 0,
            max_size,
        }
    }

    pub fn with_default_max() -> Self {
        Self::new(DEFAULT_MAX_CONTEXT_BYTES)
    }

    /// `setStepData(step, key, value)` (§4.B).
    pub fn set_step_data(&mut self, step: &str, key: &str, value: ConfigValue) -> Result<()> {
        self.write(step, key, value)
    }

    /// `setParameter(key, value)` — writes to the reserved `_parameters`
    /// namespace (§4.B).
    pub fn set_parameter(&mut self, key: &str, value: ConfigValue) -> Result<()> {
        self.write(PARAMETERS_NAMESPACE, key, value)
    }

    /// `getStepData(step, key) -> (value, found)`.
    pub fn get_step_data(&self, step: &str, key: &str) -> Option<&ConfigValue> {
        self.namespaces.get(step)?.get(key)
    }

    pub fn get_parameter(&self, key: &str) -> Option<&ConfigValue> {
        self.get_step_data(PARAMETERS_NAMESPACE, key)
    }

    /// The raw namespace mapping (a step's full output, or `_parameters`),
    /// consulted by the template resolver.
    pub fn namespace(&self, name: &str) -> Option<&ConfigValue> {
        self.namespaces.get(name)
    }

    /// Names of every step namespace that has received at least one write
    /// (used by the "every visited step" invariant in tests/callers).
    pub fn visited_steps(&self) -> impl Iterator<Item = &str> {
        self.namespaces
            .keys()
            .filter(|k| k.as_str() != PARAMETERS_NAMESPACE)
            .map(|k| k.as_str())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Snapshot the whole context as one JSON value (used to populate
    /// `PipelineExecution::final_context` — never persisted mid-run, §9).
    pub fn snapshot(&self) -> ConfigValue {
        let map: serde_json::Map<String, ConfigValue> = self
            .namespaces
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ConfigValue::Object(map)
    }

    fn write(&mut self, namespace: &str, key: &str, value: ConfigValue) -> Result<()> {
        let entry = self
            .namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| ConfigValue::Object(serde_json::Map::new()));
        let map = entry
            .as_object_mut()
            .expect("namespace entries are always objects");

        let old_cost = map
            .get(key)
            .map(|v| estimate_size(key, v))
            .unwrap_or(0);
        let new_cost = estimate_size(key, &value);
        let candidate_size = self.size - old_cost + new_cost;

        if candidate_size > self.max_size {
            warn!(namespace, key, candidate_size, max = self.max_size, "context write would overflow, rejected");
            return Err(ContextError::Overflow { max: self.max_size });
        }

        map.insert(key.to_string(), value);
        self.size = candidate_size;
        debug!(namespace, key, size = self.size, "context write");
        Ok(())
    }
}

/// Approximate byte cost of one key/value pair: the serialized JSON length
/// plus the key itself. Exactness is not required (§3 calls this a "running
/// byte estimate").
fn estimate_size(key: &str, value: &ConfigValue) -> usize {
    key.len() + serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}
