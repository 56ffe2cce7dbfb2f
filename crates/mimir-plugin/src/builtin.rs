//! The built-in `default` plugin: `http_request`, `parse_json`, `if_else`,
//! `set_context`, `get_context`, `goto` (§4.A, §4.C).

use crate::error::{PluginError, Result};
use crate::trait_def::Plugin;
use async_trait::async_trait;
use mimir_context::PipelineContext;
use mimir_types::{is_truthy_str, ConfigValue, PluginCategory};
use std::collections::HashMap;

/// Default namespace `set_context`/`get_context` write/read when `step` is
/// not given (§4.C).
pub const GLOBAL_NAMESPACE: &str = "_global";

pub struct DefaultPlugin {
    http: reqwest::Client,
}

impl DefaultPlugin {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for DefaultPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn config_str<'a>(config: &'a HashMap<String, ConfigValue>, key: &str) -> Option<&'a str> {
    config.get(key).and_then(|v| v.as_str())
}

fn config_value_to_string(config: &HashMap<String, ConfigValue>, key: &str) -> Option<String> {
    config.get(key).map(|v| match v {
        ConfigValue::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[async_trait]
impl Plugin for DefaultPlugin {
    async fn execute(
        &self,
        action: &str,
        config: &HashMap<String, ConfigValue>,
        context: &mut PipelineContext,
    ) -> Result<HashMap<String, ConfigValue>> {
        match action {
            "http_request" => self.http_request(config).await,
            "parse_json" => parse_json(config),
            "if_else" => if_else(config),
            "set_context" => set_context(config, context),
            "get_context" => get_context(config, context),
            "goto" => goto(config),
            other => Err(PluginError::ExecutionFailed {
                action: other.to_string(),
                message: format!("unsupported built-in action '{other}'"),
            }),
        }
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Default
    }

    fn name(&self) -> &str {
        "default"
    }

    fn validate_config(&self, config: &HashMap<String, ConfigValue>) -> Result<()> {
        // The built-in actions validate their own required fields at
        // execution time (each is a one-shot call, not a long-lived
        // resource), so this is intentionally permissive — matching the
        // "pure check against the plugin's schema" contract with an empty
        // schema for `default`.
        let _ = config;
        Ok(())
    }
}

impl DefaultPlugin {
    async fn http_request(
        &self,
        config: &HashMap<String, ConfigValue>,
    ) -> Result<HashMap<String, ConfigValue>> {
        let url = config_str(config, "url").ok_or_else(|| PluginError::InvalidConfig(
            "http_request requires a 'url' field".into(),
        ))?;
        let method = config_str(config, "method").unwrap_or("GET").to_uppercase();

        let mut builder = self.http.request(
            method
                .parse()
                .map_err(|_| PluginError::InvalidConfig(format!("invalid HTTP method '{method}'")))?,
            url,
        );

        if let Some(headers) = config.get("headers").and_then(|v| v.as_object()) {
            for (k, v) in headers {
                if let Some(v) = v.as_str() {
                    builder = builder.header(k, v);
                }
            }
        }
        if let Some(body) = config.get("body") {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: serde_json::Map<String, ConfigValue> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), ConfigValue::String(v.to_string()))))
            .collect();
        let body_text = response.text().await?;
        let body_value = serde_json::from_str(&body_text).unwrap_or(ConfigValue::String(body_text));

        let mut response_obj = serde_json::Map::new();
        response_obj.insert("status_code".to_string(), ConfigValue::from(status));
        response_obj.insert("body".to_string(), body_value);
        response_obj.insert("headers".to_string(), ConfigValue::Object(headers));

        let mut outputs = HashMap::new();
        outputs.insert("response".to_string(), ConfigValue::Object(response_obj));
        Ok(outputs)
    }
}

fn parse_json(config: &HashMap<String, ConfigValue>) -> Result<HashMap<String, ConfigValue>> {
    let data = config.get("data").ok_or_else(|| {
        PluginError::InvalidConfig("parse_json requires a 'data' field".into())
    })?;

    let parsed = match data {
        ConfigValue::String(s) => serde_json::from_str(s).map_err(|e| PluginError::ExecutionFailed {
            action: "parse_json".into(),
            message: e.to_string(),
        })?,
        other => other.clone(),
    };

    let mut outputs = HashMap::new();
    outputs.insert("parsed".to_string(), parsed);
    Ok(outputs)
}

fn if_else(config: &HashMap<String, ConfigValue>) -> Result<HashMap<String, ConfigValue>> {
    let condition = config_value_to_string(config, "condition").ok_or_else(|| {
        PluginError::InvalidConfig("if_else requires a 'condition' field".into())
    })?;
    let if_true = config.get("if_true").cloned().unwrap_or(ConfigValue::Null);
    let if_false = config.get("if_false").cloned().unwrap_or(ConfigValue::Null);

    let mut outputs = HashMap::new();
    outputs.insert(
        "result".to_string(),
        if is_truthy_str(&condition) { if_true } else { if_false },
    );
    Ok(outputs)
}

fn set_context(
    config: &HashMap<String, ConfigValue>,
    context: &mut PipelineContext,
) -> Result<HashMap<String, ConfigValue>> {
    let key = config_str(config, "key").ok_or_else(|| {
        PluginError::InvalidConfig("set_context requires a 'key' field".into())
    })?;
    let value = config.get("value").cloned().unwrap_or(ConfigValue::Null);
    let namespace = config_str(config, "step").unwrap_or(GLOBAL_NAMESPACE);

    context.set_step_data(namespace, key, value.clone())?;

    let mut outputs = HashMap::new();
    outputs.insert(key.to_string(), value);
    Ok(outputs)
}

fn get_context(
    config: &HashMap<String, ConfigValue>,
    context: &mut PipelineContext,
) -> Result<HashMap<String, ConfigValue>> {
    let key = config_str(config, "key").ok_or_else(|| {
        PluginError::InvalidConfig("get_context requires a 'key' field".into())
    })?;
    let namespace = config_str(config, "step").unwrap_or(GLOBAL_NAMESPACE);

    let value = context.get_step_data(namespace, key).cloned().unwrap_or(ConfigValue::Null);

    let mut outputs = HashMap::new();
    outputs.insert(key.to_string(), value);
    Ok(outputs)
}

fn goto(config: &HashMap<String, ConfigValue>) -> Result<HashMap<String, ConfigValue>> {
    let target = config_str(config, "target").ok_or_else(|| {
        PluginError::InvalidConfig("goto requires a 'target' field".into())
    })?;

    let mut outputs = HashMap::new();
    outputs.insert("goto".to_string(), ConfigValue::String(target.to_string()));
    Ok(outputs)
}
