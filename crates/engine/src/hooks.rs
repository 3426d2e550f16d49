//! Optional collaborators: admission guardrails and audit recording.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use la_domain::error::Result;

/// What the guardrails see before any model call is made.
#[derive(Debug, Clone)]
pub struct GuardInput<'a> {
    pub owner_id: &'a str,
    pub conversation_id: &'a str,
    pub user_text: &'a str,
}

/// Guardrails verdict.
#[derive(Debug, Clone)]
pub struct Admission {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl Admission {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Pre-call admission plus a completion signal. A denial aborts the run
/// before the first model call.
#[async_trait]
pub trait Guardrails: Send + Sync {
    async fn check(&self, input: GuardInput<'_>) -> Result<Admission>;

    /// Called once per successfully completed run.
    async fn notify_success(&self, owner_id: &str, user_text: &str, final_text: &str) {
        let _ = (owner_id, user_text, final_text);
    }
}

/// One audited tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub owner_id: String,
    pub session_id: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub agent_name: String,
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub is_write_op: bool,
    pub timestamp: DateTime<Utc>,
}

/// Receives audit entries. Failures are the sink's problem; the engine
/// logs and moves on.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AllowAll;

    #[async_trait]
    impl Guardrails for AllowAll {
        async fn check(&self, _input: GuardInput<'_>) -> Result<Admission> {
            Ok(Admission::allow())
        }
    }

    #[tokio::test]
    async fn default_notify_success_is_a_no_op() {
        let guard = AllowAll;
        guard.notify_success("owner_1", "hi", "hello").await;
        let verdict = guard
            .check(GuardInput {
                owner_id: "owner_1",
                conversation_id: "conv_1",
                user_text: "hi",
            })
            .await
            .unwrap();
        assert!(verdict.allowed);
    }

    #[test]
    fn audit_entry_serializes_without_optionals() {
        let entry = AuditEntry {
            id: "audit_1".into(),
            owner_id: "owner_1".into(),
            session_id: "sess_1".into(),
            request_id: "req_1".into(),
            parent_id: None,
            agent_name: "ledger-agent".into(),
            tool_name: "get_balance".into(),
            tool_input: serde_json::json!({}),
            tool_output: "{\"usd\":\"100.00\"}".into(),
            error: None,
            duration_ms: 12,
            is_write_op: false,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("parent_id").is_none());
        assert!(json.get("error").is_none());
        assert_eq!(json["tool_name"], "get_balance");
    }
}
