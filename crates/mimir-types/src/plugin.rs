//! Registration record for a plugin (§4.A, §6 "Plugin contract").

use serde::{Deserialize, Serialize};

/// The four categories a plugin can belong to, plus `default` for the
/// built-in control-flow executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginCategory {
    Input,
    #[serde(rename = "Data_Processing")]
    DataProcessing,
    #[serde(rename = "AIModels")]
    AiModels,
    Output,
    #[serde(rename = "default")]
    Default,
}

impl PluginCategory {
    /// The exact tag used in the `<category>.<name>` composite key.
    pub fn as_tag(&self) -> &'static str {
        match self {
            PluginCategory::Input => "Input",
            PluginCategory::DataProcessing => "Data_Processing",
            PluginCategory::AiModels => "AIModels",
            PluginCategory::Output => "Output",
            PluginCategory::Default => "default",
        }
    }
}

impl std::fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// What a plugin advertises for discovery (§6: "Plugins expose
/// `{category, name, version, configSchema, supportedActions}`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub category: PluginCategory,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub config_schema: Option<serde_json::Value>,
    pub supported_actions: Vec<String>,
}

impl PluginDescriptor {
    /// The composite `<category>.<name>` key the registry indexes by.
    pub fn composite_key(&self) -> String {
        format!("{}.{}", self.category.as_tag(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_matches_category_tag() {
        let d = PluginDescriptor {
            category: PluginCategory::DataProcessing,
            name: "transform".into(),
            version: "1.0.0".into(),
            config_schema: None,
            supported_actions: vec!["transform".into()],
        };
        assert_eq!(d.composite_key(), "Data_Processing.transform");
    }
}
