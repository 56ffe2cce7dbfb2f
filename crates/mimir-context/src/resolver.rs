//! Template resolver for `{{ context.<stepName>.<key>[.<nested>...] }}`
//! expressions (§4.B).
//!
//! Two forms are recognized:
//! - `context.<stepName>.<key>...` — reads a previously written step's
//!   output, or the reserved `_parameters` namespace.
//! - any other identifier — an opaque lookup against the *local* scope (the
//!   per-step mapping passed by the caller), used for same-step references
//!   like `{{ result }}`.
//!
//! Resolution is single-pass: the resolved value is never itself re-scanned
//! for further `{{ }}` segments.

use crate::error::{ContextError, Result};
use crate::store::PipelineContext;
use mimir_types::ConfigValue;
use std::collections::HashMap;

/// Governs what happens when a template path cannot be resolved. Chosen once
/// per engine and applied uniformly (§3, §9 "do not mix modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Leave the literal `{{ ... }}` token in place and continue.
    #[default]
    Permissive,
    /// Fail the step with the underlying resolution error.
    Strict,
}

pub struct ContextResolver<'a> {
    context: &'a PipelineContext,
    local: Option<&'a HashMap<String, ConfigValue>>,
    strictness: Strictness,
}

impl<'a> ContextResolver<'a> {
    pub fn new(context: &'a PipelineContext, strictness: Strictness) -> Self {
        Self {
            context,
            local: None,
            strictness,
        }
    }

    /// Attach the current step's own staged output map, consulted for
    /// expressions that don't start with `context.`.
    pub fn with_local(mut self, local: &'a HashMap<String, ConfigValue>) -> Self {
        self.local = Some(local);
        self
    }

    /// Resolve all `{{...}}` templates in a JSON value tree.
    pub fn resolve_value(&self, value: &ConfigValue) -> Result<ConfigValue> {
        match value {
            ConfigValue::String(s) => self.resolve_string(s),
            ConfigValue::Object(map) => {
                let mut resolved = serde_json::Map::new();
                for (k, v) in map {
                    resolved.insert(k.clone(), self.resolve_value(v)?);
                }
                Ok(ConfigValue::Object(resolved))
            }
            ConfigValue::Array(arr) => {
                let resolved: Result<Vec<ConfigValue>> =
                    arr.iter().map(|v| self.resolve_value(v)).collect();
                Ok(ConfigValue::Array(resolved?))
            }
            other => Ok(other.clone()),
        }
    }

    /// Resolve all `{{...}}` templates in a single string.
    pub fn resolve_string(&self, s: &str) -> Result<ConfigValue> {
        let expressions = parse_template_expressions(s);

        if expressions.is_empty() {
            return Ok(ConfigValue::String(s.to_string()));
        }

        if expressions.len() == 1 && expressions[0].full_match == s {
            return match self.resolve_expression(&expressions[0].path) {
                Ok(v) => Ok(v),
                Err(e) => self.on_unresolved(&expressions[0].full_match, e),
            };
        }

        let mut result = s.to_string();
        for expr in &expressions {
            match self.resolve_expression(&expr.path) {
                Ok(v) => {
                    let replacement = value_to_string(&v);
                    result = result.replace(&expr.full_match, &replacement);
                }
                Err(e) => {
                    if self.strictness == Strictness::Strict {
                        return Err(e);
                    }
                    // leave the literal token untouched and continue
                }
            }
        }

        Ok(ConfigValue::String(result))
    }

    fn on_unresolved(&self, full_match: &str, err: ContextError) -> Result<ConfigValue> {
        match self.strictness {
            Strictness::Strict => Err(err),
            Strictness::Permissive => Ok(ConfigValue::String(full_match.to_string())),
        }
    }

    /// Resolve a single dot-separated path expression.
    fn resolve_expression(&self, path: &str) -> Result<ConfigValue> {
        let segments = parse_path_segments(path);
        if segments.is_empty() {
            return Err(ContextError::EmptyExpression);
        }

        if segments[0].name == "context" {
            if segments.len() < 2 {
                return Err(ContextError::EmptyExpression);
            }
            let namespace = &segments[1].name;
            let root_value = self
                .context
                .namespace(namespace)
                .ok_or_else(|| ContextError::UnknownKey {
                    path: path.to_string(),
                    root: namespace.clone(),
                })?;

            let mut current = root_value;
            for segment in &segments[2..] {
                current = navigate_segment(current, segment).ok_or_else(|| {
                    ContextError::UnresolvedSegment {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    }
                })?;
            }
            return Ok(current.clone());
        }

        // Opaque identifier: resolved against the local (same-step) scope.
        let root_key = &segments[0].name;
        let local = self.local.ok_or_else(|| ContextError::UnknownKey {
            path: path.to_string(),
            root: root_key.clone(),
        })?;
        let root_value = local.get(root_key.as_str()).ok_or_else(|| ContextError::UnknownKey {
            path: path.to_string(),
            root: root_key.clone(),
        })?;

        let mut current = root_value;
        for segment in &segments[1..] {
            current = navigate_segment(current, segment).ok_or_else(|| ContextError::UnresolvedSegment {
                path: path.to_string(),
                segment: segment.to_string(),
            })?;
        }
        Ok(current.clone())
    }
}

#[derive(Debug)]
struct TemplateExpression {
    full_match: String,
    path: String,
}

fn parse_template_expressions(s: &str) -> Vec<TemplateExpression> {
    let mut results = Vec::new();
    let mut remaining = s;

    while let Some(start) = remaining.find("{{") {
        if let Some(end) = remaining[start..].find("}}") {
            let full_end = start + end + 2;
            let full_match = &remaining[start..full_end];
            let inner = remaining[start + 2..start + end].trim();

            if !inner.is_empty() {
                results.push(TemplateExpression {
                    full_match: full_match.to_string(),
                    path: inner.to_string(),
                });
            }

            remaining = &remaining[full_end..];
        } else {
            break;
        }
    }

    results
}

#[derive(Debug)]
struct PathSegment {
    name: String,
    index: Option<usize>,
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.name, i),
            None => write!(f, "{}", self.name),
        }
    }
}

fn parse_path_segments(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .map(|part| {
            if let Some(bracket_start) = part.find('[') {
                if let Some(bracket_end) = part.find(']') {
                    let name = part[..bracket_start].to_string();
                    let idx_str = &part[bracket_start + 1..bracket_end];
                    let index = idx_str.parse::<usize>().ok();
                    return PathSegment { name, index };
                }
            }
            PathSegment {
                name: part.to_string(),
                index: None,
            }
        })
        .collect()
}

fn navigate_segment<'a>(value: &'a ConfigValue, segment: &PathSegment) -> Option<&'a ConfigValue> {
    let field = if segment.name.is_empty() {
        value
    } else {
        value.get(&segment.name)?
    };

    match segment.index {
        Some(i) => field.get(i),
        None => Some(field),
    }
}

fn value_to_string(value: &ConfigValue) -> String {
    match value {
        ConfigValue::String(s) => s.clone(),
        ConfigValue::Null => "null".to_string(),
        ConfigValue::Bool(b) => b.to_string(),
        ConfigValue::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
    }
}
