//! Executor adapter — one uniform call surface over in-process handlers
//! and the custodial execution API.

use std::sync::Arc;

use la_custodian::Custodian;
use la_domain::error::{Error, Result};
use la_domain::tool::{ToolOutcome, ToolParams};

use crate::registry::ToolRegistry;
use crate::tool::ToolBackend;

#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    custodian: Arc<dyn Custodian>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, custodian: Arc<dyn Custodian>) -> Self {
        Self {
            registry,
            custodian,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute a read-path tool call.
    pub async fn execute(&self, name: &str, params: ToolParams) -> Result<ToolOutcome> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| Error::Other(format!("unknown tool: {name}")))?;
        tracing::debug!(tool = name, request_id = %params.request_id, "dispatching tool");
        match &tool.backend {
            ToolBackend::Local(handler) => handler.call(params).await,
            ToolBackend::Custodial => {
                self.custodian
                    .execute(&params.owner_id, name, &params.input, &params.request_id)
                    .await
            }
        }
    }

    /// Execute through the write path. The custodial two-phase submit
    /// receives the confirmation id (empty string = already confirmed by
    /// the human caller); in-process tools see the same params and
    /// ignore the distinction.
    pub async fn execute_write(&self, name: &str, params: ToolParams) -> Result<ToolOutcome> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| Error::Other(format!("unknown tool: {name}")))?;
        tracing::debug!(tool = name, request_id = %params.request_id, "dispatching write tool");
        match &tool.backend {
            ToolBackend::Local(handler) => handler.call(params).await,
            ToolBackend::Custodial => {
                let confirmation_id = params.confirmation_id.as_deref().unwrap_or("");
                self.custodian
                    .execute_write(
                        &params.owner_id,
                        name,
                        &params.input,
                        &params.request_id,
                        confirmation_id,
                    )
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolHandler};
    use async_trait::async_trait;
    use la_custodian::mock::MockCustodian;
    use la_domain::schema::ObjectSchema;
    use la_domain::tool::ToolDefinition;
    use serde_json::json;

    struct Fixed(&'static str);

    #[async_trait]
    impl ToolHandler for Fixed {
        async fn call(&self, _params: ToolParams) -> Result<ToolOutcome> {
            Ok(ToolOutcome::ok(json!({"from": self.0})))
        }
    }

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.into(),
            description: "test".into(),
            input_schema: ObjectSchema::new().with_thought(false).build(),
            requires_confirmation: false,
            summary_template: None,
        }
    }

    fn params() -> ToolParams {
        ToolParams {
            owner_id: "owner_1".into(),
            input: json!({}),
            request_id: "req_1".into(),
            confirmation_id: None,
        }
    }

    fn executor(mock: Arc<MockCustodian>) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry
            .register(Tool::local(definition("local_tool"), Arc::new(Fixed("local"))))
            .unwrap();
        registry
            .register(Tool::custodial(definition("get_balance")))
            .unwrap();
        ToolExecutor::new(Arc::new(registry), mock)
    }

    #[tokio::test]
    async fn routes_local_and_custodial() {
        let mock = Arc::new(MockCustodian::new());
        mock.program("get_balance", ToolOutcome::ok(json!({"usd": "100.00"})));
        let executor = executor(mock.clone());

        let out = executor.execute("local_tool", params()).await.unwrap();
        assert_eq!(out.data["from"], "local");
        assert!(mock.calls().is_empty());

        let out = executor.execute("get_balance", params()).await.unwrap();
        assert_eq!(out.data["usd"], "100.00");
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let executor = executor(Arc::new(MockCustodian::new()));
        let err = executor.execute("mystery", params()).await.unwrap_err();
        assert!(err.to_string().contains("unknown tool: mystery"));
    }

    #[tokio::test]
    async fn write_path_threads_confirmation_id() {
        let mock = Arc::new(MockCustodian::new());
        mock.program("get_balance", ToolOutcome::ok(json!({})));
        let executor = executor(mock.clone());

        let mut p = params();
        p.confirmation_id = Some(String::new());
        executor.execute_write("get_balance", p).await.unwrap();

        let writes = mock.write_calls();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].confirmation_id.as_deref(), Some(""));
    }
}
