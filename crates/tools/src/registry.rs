//! Tool registry — name-keyed definitions, wire projection, summaries.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use la_providers::WireTool;

use crate::tool::Tool;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),
}

/// Holds every registered tool. Built once at startup, then shared
/// immutably behind an `Arc` — readers take no lock.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<Tool>>,
    /// Registration order, so the provider-facing list is stable.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// The provider-facing tool list, in registration order. `filter` is
    /// an allow-list of names; `None` exposes everything.
    pub fn wire_tools(&self, filter: Option<&[String]>) -> Vec<WireTool> {
        self.order
            .iter()
            .filter(|name| filter.map_or(true, |allowed| allowed.iter().any(|a| a == *name)))
            .filter_map(|name| self.tools.get(name))
            .map(|tool| WireTool {
                name: tool.definition.name.clone(),
                description: tool.definition.description.clone(),
                input_schema: tool.definition.input_schema.clone(),
            })
            .collect()
    }

    /// Render a tool's confirmation summary from its template. Tools
    /// without a template fall back to their name.
    pub fn summary_of(&self, tool: &Tool, input: &Value) -> String {
        match &tool.definition.summary_template {
            Some(template) => render_template(template, input),
            None => tool.definition.name.clone(),
        }
    }
}

/// Substitute `{field}` placeholders with values read from the input
/// blob. A missing field renders literally as `{field}` — never an
/// error, the summary is best-effort display text.
pub fn render_template(template: &str, input: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut key = String::new();
        let mut closed = false;
        for k in chars.by_ref() {
            if k == '}' {
                closed = true;
                break;
            }
            key.push(k);
        }
        if !closed {
            // Dangling brace: emit what we consumed, literally.
            out.push('{');
            out.push_str(&key);
            continue;
        }
        match input.get(&key) {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => {
                out.push('{');
                out.push_str(&key);
                out.push('}');
            }
        }
    }
    out
}
