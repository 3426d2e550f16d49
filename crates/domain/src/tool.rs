use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition exposed to the LLM and to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name within a registry.
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's input. Always carries a `thought`
    /// property; see [`crate::schema::ObjectSchema`].
    pub input_schema: Value,
    /// Side-effectful tools must not execute until a human approves.
    #[serde(default)]
    pub requires_confirmation: bool,
    /// Template rendered for the confirmation prompt, with `{field}`
    /// placeholders read from the tool input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_template: Option<String>,
}

/// Parameters handed to every tool handler.
#[derive(Debug, Clone)]
pub struct ToolParams {
    /// The principal this call acts on behalf of.
    pub owner_id: String,
    /// The model-emitted input blob.
    pub input: Value,
    /// Propagated to the custodian for request correlation.
    pub request_id: String,
    /// `None` for reads. `Some("")` on the write path means the human
    /// caller already confirmed and the two-phase submit collapses to
    /// the confirm leg.
    pub confirmation_id: Option<String>,
}

/// The uniform result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set by a collaborator that wants its own confirmation UI to run,
    /// independent of the model-side confirmation flow.
    #[serde(default)]
    pub requires_confirmation: bool,
}

impl ToolOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            requires_confirmation: false,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(message.into()),
            requires_confirmation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_constructors() {
        let ok = ToolOutcome::ok(serde_json::json!({"usd": "100.00"}));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let err = ToolOutcome::err("no such user");
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("no such user"));
        assert!(err.data.is_null());
    }

    #[test]
    fn definition_deserializes_without_optional_fields() {
        let json = serde_json::json!({
            "name": "get_balance",
            "description": "Read wallet balances",
            "input_schema": {"type": "object"},
        });
        let def: ToolDefinition = serde_json::from_value(json).unwrap();
        assert!(!def.requires_confirmation);
        assert!(def.summary_template.is_none());
    }
}
