//! The plugin contract every step executor implements (§4.A).

use crate::error::Result;
use async_trait::async_trait;
use mimir_context::PipelineContext;
use mimir_types::{ConfigValue, PluginCategory};
use std::collections::HashMap;

/// A registered step executor. `execute` is given already-template-resolved
/// config (the engine resolves `step.config` before dispatch, §4.C step 3)
/// and mutable context access, since `set_context`/`get_context` read and
/// write namespaces other than the current step's.
///
/// "Deterministic absent external I/O" (§4.A) is a contract on
/// implementations, not something the trait can enforce.
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn execute(
        &self,
        action: &str,
        config: &HashMap<String, ConfigValue>,
        context: &mut PipelineContext,
    ) -> Result<HashMap<String, ConfigValue>>;

    fn category(&self) -> PluginCategory;

    fn name(&self) -> &str;

    /// Pure check against the plugin's schema — no I/O, no context access.
    fn validate_config(&self, config: &HashMap<String, ConfigValue>) -> Result<()>;
}
