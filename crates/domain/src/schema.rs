//! Declarative builder for tool input schemas.
//!
//! Every tool input is a JSON-Schema object with a reserved `thought`
//! property. For confirmation-required tools the thought is mandatory —
//! it is what the human reviews alongside the action summary.

use serde_json::{json, Map, Value};

/// Name of the reserved reasoning field present on every tool schema.
pub const THOUGHT_FIELD: &str = "thought";

const THOUGHT_DESCRIPTION: &str =
    "Brief reasoning for this action. Shown to the user when confirmation is required.";

/// Builder for a JSON-Schema object with typed properties and a required
/// list. All methods take `self` by value, so composing a shared fragment
/// means cloning it first — fragments never alias.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string_property(mut self, name: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": "string", "description": description }),
        );
        self
    }

    pub fn enum_property(mut self, name: &str, description: &str, variants: &[&str]) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": "string", "description": description, "enum": variants }),
        );
        self
    }

    pub fn integer_property(mut self, name: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": "integer", "description": description }),
        );
        self
    }

    pub fn number_property(mut self, name: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": "number", "description": description }),
        );
        self
    }

    pub fn boolean_property(mut self, name: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": "boolean", "description": description }),
        );
        self
    }

    /// Insert a pre-built property fragment. The fragment is stored as
    /// given; callers composing from a shared schema clone it first.
    pub fn property(mut self, name: &str, fragment: Value) -> Self {
        self.properties.insert(name.to_string(), fragment);
        self
    }

    /// Mark properties as required. Duplicates are ignored.
    pub fn require(mut self, names: &[&str]) -> Self {
        for name in names {
            if !self.required.iter().any(|r| r == name) {
                self.required.push((*name).to_string());
            }
        }
        self
    }

    /// Add the reserved `thought` property. When `required` is true (the
    /// tool needs confirmation) `thought` is appended to the required
    /// list. Idempotent: applying this twice yields the same schema as
    /// applying it once.
    pub fn with_thought(mut self, required: bool) -> Self {
        self.properties.insert(
            THOUGHT_FIELD.to_string(),
            json!({ "type": "string", "description": THOUGHT_DESCRIPTION }),
        );
        if required && !self.required.iter().any(|r| r == THOUGHT_FIELD) {
            self.required.push(THOUGHT_FIELD.to_string());
        }
        self
    }

    /// Render the final JSON-Schema value.
    pub fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": Value::Object(self.properties),
            "required": self.required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_object_with_properties_and_required() {
        let schema = ObjectSchema::new()
            .string_property("recipient", "Who to pay")
            .string_property("amount", "Decimal amount")
            .require(&["recipient", "amount"])
            .with_thought(true)
            .build();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["recipient"]["type"], "string");
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["recipient", "amount", "thought"]);
    }

    #[test]
    fn thought_not_required_for_read_tools() {
        let schema = ObjectSchema::new()
            .enum_property("currency", "Currency code", &["USDC", "EURC"])
            .with_thought(false)
            .build();

        assert!(schema["properties"]["thought"].is_object());
        assert!(schema["required"].as_array().unwrap().is_empty());
    }

    #[test]
    fn with_thought_is_idempotent() {
        let once = ObjectSchema::new()
            .string_property("query", "Search term")
            .require(&["query"])
            .with_thought(true)
            .build();
        let twice = ObjectSchema::new()
            .string_property("query", "Search term")
            .require(&["query"])
            .with_thought(true)
            .with_thought(true)
            .build();
        assert_eq!(once, twice);
    }

    #[test]
    fn require_deduplicates() {
        let schema = ObjectSchema::new()
            .string_property("query", "Search term")
            .require(&["query"])
            .require(&["query"])
            .build();
        assert_eq!(schema["required"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn cloned_fragment_does_not_alias() {
        let base = ObjectSchema::new().string_property("note", "Optional note");
        let a = base.clone().with_thought(true).build();
        let b = base.with_thought(false).build();
        assert_ne!(a["required"], b["required"]);
        // Both still carry the shared property.
        assert!(a["properties"]["note"].is_object());
        assert!(b["properties"]["note"].is_object());
    }
}
