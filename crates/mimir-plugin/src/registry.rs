//! Composite-key registry: `<category>.<name>` → executor (§4.A).
//!
//! Read-mostly, written only at startup/discovery, per §5's guidance to
//! prefer a read-write lock (or an immutable snapshot) over a concurrent map
//! since lookup is on the hot path.

use crate::error::{PluginError, Result};
use crate::trait_def::Plugin;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Registry {
    entries: RwLock<HashMap<String, Arc<dyn Plugin>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register under `<category>.<name>`. The built-in `default` category
    /// is additionally reachable under the bare aliases `"default"` and
    /// `"builtin"` (§3 StepDefinition.plugin: "or `default`/`builtin` for
    /// built-ins"). Fails with a conflict error on a duplicate key (§4.A).
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let mut keys = vec![composite_key(plugin.category().as_tag(), plugin.name())];
        if plugin.category() == mimir_types::PluginCategory::Default {
            keys.push("default".to_string());
            keys.push("builtin".to_string());
        }

        let mut entries = self.entries.write();
        for key in &keys {
            if entries.contains_key(key) {
                return Err(PluginError::Conflict(key.clone()));
            }
        }
        for key in keys {
            entries.insert(key, plugin.clone());
        }
        Ok(())
    }

    /// O(1) lookup by composite key, e.g. `"Input.api"` or `"default"`.
    pub fn lookup(&self, key: &str) -> Result<Arc<dyn Plugin>> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(key.to_string()))
    }

    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn composite_key(category: &str, name: &str) -> String {
    format!("{category}.{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::DefaultPlugin;

    #[test]
    fn register_then_lookup_by_composite_key() {
        let registry = Registry::new();
        registry.register(Arc::new(DefaultPlugin::new())).unwrap();
        assert!(registry.lookup("default").is_ok());
        assert!(registry.lookup("builtin").is_ok());
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Registry::new();
        registry.register(Arc::new(DefaultPlugin::new())).unwrap();
        let err = registry.register(Arc::new(DefaultPlugin::new()));
        assert!(err.is_err());
    }

    #[test]
    fn lookup_of_unregistered_key_fails() {
        let registry = Registry::new();
        assert!(registry.lookup("Input.nonexistent").is_err());
    }
}
