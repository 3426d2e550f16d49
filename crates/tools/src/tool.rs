use std::sync::Arc;

use async_trait::async_trait;

use la_domain::error::Result;
use la_domain::tool::{ToolDefinition, ToolOutcome, ToolParams};

/// An in-process tool implementation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, params: ToolParams) -> Result<ToolOutcome>;

    /// Optional observation override. Returning `None` falls back to the
    /// engine's default formatting.
    fn format_observation(&self, outcome: &ToolOutcome) -> Option<String> {
        let _ = outcome;
        None
    }
}

/// Where a tool's execution lives.
#[derive(Clone)]
pub enum ToolBackend {
    /// Runs in-process. Ignores the read/write two-phase distinction.
    Local(Arc<dyn ToolHandler>),
    /// Forwarded to the custodial execution API under the tool's name.
    Custodial,
}

/// A registered tool: definition + execution backend.
#[derive(Clone)]
pub struct Tool {
    pub definition: ToolDefinition,
    pub(crate) backend: ToolBackend,
}

impl Tool {
    pub fn local(definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            definition,
            backend: ToolBackend::Local(handler),
        }
    }

    pub fn custodial(definition: ToolDefinition) -> Self {
        Self {
            definition,
            backend: ToolBackend::Custodial,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn requires_confirmation(&self) -> bool {
        self.definition.requires_confirmation
    }

    /// The handler's observation override, when one exists.
    pub fn format_observation(&self, outcome: &ToolOutcome) -> Option<String> {
        match &self.backend {
            ToolBackend::Local(handler) => handler.format_observation(outcome),
            ToolBackend::Custodial => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use la_domain::schema::ObjectSchema;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, params: ToolParams) -> Result<ToolOutcome> {
            Ok(ToolOutcome::ok(params.input))
        }

        fn format_observation(&self, outcome: &ToolOutcome) -> Option<String> {
            Some(format!("echoed: {}", outcome.data))
        }
    }

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.into(),
            description: "test tool".into(),
            input_schema: ObjectSchema::new().with_thought(false).build(),
            requires_confirmation: false,
            summary_template: None,
        }
    }

    #[tokio::test]
    async fn local_tool_calls_handler() {
        let tool = Tool::local(definition("echo"), Arc::new(Echo));
        match &tool.backend {
            ToolBackend::Local(handler) => {
                let out = handler
                    .call(ToolParams {
                        owner_id: "owner_1".into(),
                        input: serde_json::json!({"k": "v"}),
                        request_id: "req_1".into(),
                        confirmation_id: None,
                    })
                    .await
                    .unwrap();
                assert_eq!(out.data["k"], "v");
            }
            _ => panic!("expected local backend"),
        }
    }

    #[test]
    fn custodial_tool_has_no_formatter() {
        let tool = Tool::custodial(definition("get_balance"));
        assert!(tool
            .format_observation(&ToolOutcome::ok(serde_json::Value::Null))
            .is_none());

        let local = Tool::local(definition("echo"), Arc::new(Echo));
        let formatted = local
            .format_observation(&ToolOutcome::ok(serde_json::json!(1)))
            .unwrap();
        assert_eq!(formatted, "echoed: 1");
    }
}
