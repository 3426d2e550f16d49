//! Programmable in-process custodian for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use la_domain::error::Result;
use la_domain::tool::ToolOutcome;

use crate::provider::Custodian;

/// A record of one call the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub owner_id: String,
    pub tool: String,
    pub input: Value,
    pub request_id: String,
    pub confirmation_id: Option<String>,
    pub is_write: bool,
}

/// Test double keyed by tool name. Unprogrammed tools return a
/// not-found error outcome rather than a transport failure.
#[derive(Default)]
pub struct MockCustodian {
    outcomes: Mutex<HashMap<String, ToolOutcome>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockCustodian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self, tool: &str, outcome: ToolOutcome) {
        self.outcomes.lock().insert(tool.to_string(), outcome);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Calls that went through the write path.
    pub fn write_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().iter().filter(|c| c.is_write).cloned().collect()
    }

    fn record(
        &self,
        owner_id: &str,
        tool: &str,
        input: &Value,
        request_id: &str,
        confirmation_id: Option<&str>,
        is_write: bool,
    ) {
        self.calls.lock().push(RecordedCall {
            owner_id: owner_id.to_string(),
            tool: tool.to_string(),
            input: input.clone(),
            request_id: request_id.to_string(),
            confirmation_id: confirmation_id.map(str::to_string),
            is_write,
        });
    }

    fn outcome_for(&self, tool: &str) -> ToolOutcome {
        self.outcomes
            .lock()
            .get(tool)
            .cloned()
            .unwrap_or_else(|| ToolOutcome::err(format!("tool not found: {tool}")))
    }
}

#[async_trait]
impl Custodian for MockCustodian {
    async fn execute(
        &self,
        owner_id: &str,
        tool: &str,
        input: &Value,
        request_id: &str,
    ) -> Result<ToolOutcome> {
        self.record(owner_id, tool, input, request_id, None, false);
        Ok(self.outcome_for(tool))
    }

    async fn execute_write(
        &self,
        owner_id: &str,
        tool: &str,
        input: &Value,
        request_id: &str,
        confirmation_id: &str,
    ) -> Result<ToolOutcome> {
        self.record(owner_id, tool, input, request_id, Some(confirmation_id), true);
        Ok(self.outcome_for(tool))
    }
}
