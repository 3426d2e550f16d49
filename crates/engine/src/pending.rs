//! PendingAction — the suspended-run handle for confirmation flows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// How long a pending action stays confirmable.
const PENDING_TTL_MINUTES: i64 = 10;

/// Everything needed to resume a run after the human decides: the
/// original tool-use block id, the input, a display summary, and an
/// idempotency key so re-submission within the TTL cannot double-execute
/// at the tool layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    /// Stable digest of `(owner_id, tool, input)`.
    pub idempotency_key: String,
    pub session_id: String,
    pub owner_id: String,
    pub tool: String,
    pub input: Value,
    pub thought: String,
    /// Human-facing summary rendered from the tool's template.
    pub summary: String,
    /// The model-emitted tool-use id; resumption appends the follow-up
    /// tool_result under this id.
    pub block_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingAction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: impl Into<String>,
        owner_id: impl Into<String>,
        tool: impl Into<String>,
        input: Value,
        thought: impl Into<String>,
        summary: impl Into<String>,
        block_id: impl Into<String>,
    ) -> Self {
        let owner_id = owner_id.into();
        let tool = tool.into();
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            idempotency_key: idempotency_key(&owner_id, &tool, &input),
            session_id: session_id.into(),
            owner_id,
            tool,
            input,
            thought: thought.into(),
            summary: summary.into(),
            block_id: block_id.into(),
            created_at,
            expires_at: created_at + Duration::minutes(PENDING_TTL_MINUTES),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Deterministic digest of `(owner_id, tool, input)`. Equal inputs give
/// equal keys regardless of JSON key order.
pub fn idempotency_key(owner_id: &str, tool: &str, input: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(input, &mut canonical);

    let mut hasher = Sha256::new();
    hasher.update(owner_id.as_bytes());
    hasher.update([0]);
    hasher.update(tool.as_bytes());
    hasher.update([0]);
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Serialize with object keys sorted at every level.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_deterministic() {
        let input = json!({"recipient": "@alice", "amount": "50"});
        let a = idempotency_key("owner_1", "send_money", &input);
        let b = idempotency_key("owner_1", "send_money", &input);
        assert_eq!(a, b);
    }

    #[test]
    fn key_ignores_object_key_order() {
        let a = json!({"amount": "50", "recipient": "@alice"});
        let b = json!({"recipient": "@alice", "amount": "50"});
        assert_eq!(
            idempotency_key("owner_1", "send_money", &a),
            idempotency_key("owner_1", "send_money", &b)
        );
    }

    #[test]
    fn key_varies_with_owner_tool_and_input() {
        let input = json!({"amount": "50"});
        let base = idempotency_key("owner_1", "send_money", &input);
        assert_ne!(base, idempotency_key("owner_2", "send_money", &input));
        assert_ne!(base, idempotency_key("owner_1", "schedule_payment", &input));
        assert_ne!(
            base,
            idempotency_key("owner_1", "send_money", &json!({"amount": "51"}))
        );
    }

    #[test]
    fn expires_ten_minutes_after_creation() {
        let pending = PendingAction::new(
            "sess_1",
            "owner_1",
            "send_money",
            json!({"amount": "50"}),
            "user asked to send",
            "Send 50 USDC to @alice",
            "toolu_1",
        );
        let ttl = pending.expires_at - pending.created_at;
        assert_eq!(ttl, Duration::minutes(10));
        assert!(!pending.is_expired());
    }

    #[test]
    fn nested_input_canonicalizes() {
        let a = json!({"outer": {"b": 1, "a": [1, 2]}});
        let b = json!({"outer": {"a": [1, 2], "b": 1}});
        assert_eq!(
            idempotency_key("o", "t", &a),
            idempotency_key("o", "t", &b)
        );
    }
}
