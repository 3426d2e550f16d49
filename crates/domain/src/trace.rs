//! ReAct trace records — one (thought, action, observation) tuple per
//! reasoning-then-acting step, totally ordered within a session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Sentinel observation for a trace suspended on human confirmation.
pub const AWAITING_CONFIRMATION: &str = "Awaiting user confirmation";

/// One ReAct step. Created in the THINK phase via [`Trace::begin`] and
/// finished exactly once via [`Trace::complete`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub session_id: String,
    pub turn_number: u32,
    /// The model's stated reasoning. Non-empty whenever the tool required
    /// confirmation.
    pub thought: String,
    /// Tool name.
    pub action: String,
    pub action_input: Value,
    /// Tool output, an error message, or [`AWAITING_CONFIRMATION`].
    pub observation: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(skip)]
    completed: bool,
}

impl Trace {
    /// Start a trace in the THINK phase. The observation is filled later
    /// by [`Trace::complete`].
    pub fn begin(
        session_id: impl Into<String>,
        turn_number: u32,
        thought: impl Into<String>,
        action: impl Into<String>,
        action_input: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            turn_number,
            thought: thought.into(),
            action: action.into(),
            action_input,
            observation: String::new(),
            success: false,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
            completed: false,
        }
    }

    /// Fill the observation. The first call wins; later calls are ignored
    /// (a trace observes exactly once).
    pub fn complete(&mut self, observation: impl Into<String>, success: bool) {
        if self.completed {
            tracing::warn!(trace_id = %self.id, "trace already completed; ignoring");
            return;
        }
        self.observation = observation.into();
        self.success = success;
        self.completed = true;
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_then_complete() {
        let mut t = Trace::begin("sess_1", 1, "checking funds", "get_balance", serde_json::json!({}));
        assert!(!t.is_complete());
        t.complete("{\"usd\":\"100.00\"}", true);
        assert!(t.is_complete());
        assert!(t.success);
    }

    #[test]
    fn observation_fills_exactly_once() {
        let mut t = Trace::begin("sess_1", 1, "", "get_balance", serde_json::json!({}));
        t.complete("first", true);
        t.complete("second", false);
        assert_eq!(t.observation, "first");
        assert!(t.success);
    }

    #[test]
    fn awaiting_confirmation_is_a_failure_observation() {
        let mut t = Trace::begin(
            "sess_1",
            1,
            "user asked to send",
            "send_money",
            serde_json::json!({"recipient": "@alice"}),
        );
        t.complete(AWAITING_CONFIRMATION, false);
        assert_eq!(t.observation, AWAITING_CONFIRMATION);
        assert!(!t.success);
    }
}
