//! Memory records — a tagged variant set, trace memories first.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendering context passed to [`MemoryRecord::format`].
#[derive(Debug, Clone)]
pub struct FormatContext<'a> {
    pub owner_id: &'a str,
    pub query: &'a str,
    pub max_chars_per_record: usize,
}

/// A stored memory. Tagged so further variants (conversation summaries,
/// user facts) can join later without touching the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryRecord {
    Trace(TraceMemory),
}

/// One remembered ReAct step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceMemory {
    pub id: String,
    pub owner_id: String,
    pub conversation_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    /// L2-normalised embedding; empty means not yet embedded.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Salience in [0, 1].
    pub importance: f32,
    pub thought: String,
    pub action: String,
    pub observation: String,
    pub success: bool,
}

impl MemoryRecord {
    pub fn id(&self) -> &str {
        match self {
            MemoryRecord::Trace(t) => &t.id,
        }
    }

    pub fn owner_id(&self) -> &str {
        match self {
            MemoryRecord::Trace(t) => &t.owner_id,
        }
    }

    pub fn conversation_id(&self) -> &str {
        match self {
            MemoryRecord::Trace(t) => &t.conversation_id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            MemoryRecord::Trace(t) => &t.content,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            MemoryRecord::Trace(t) => t.created_at,
        }
    }

    pub fn embedding(&self) -> &[f32] {
        match self {
            MemoryRecord::Trace(t) => &t.embedding,
        }
    }

    pub fn set_embedding(&mut self, embedding: Vec<f32>) {
        match self {
            MemoryRecord::Trace(t) => t.embedding = embedding,
        }
    }

    /// Render a prompt snippet bounded by the per-record budget.
    pub fn format(&self, ctx: &FormatContext<'_>) -> String {
        match self {
            MemoryRecord::Trace(t) => {
                let status = if t.success { "ok" } else { "failed" };
                let line = format!(
                    "Thought: {} | Action: {} ({status}) | Observation: {}",
                    t.thought, t.action, t.observation
                );
                truncate_chars(&line, ctx.max_chars_per_record)
            }
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_record(thought: &str, observation: &str) -> MemoryRecord {
        MemoryRecord::Trace(TraceMemory {
            id: "mem_1".into(),
            owner_id: "owner_1".into(),
            conversation_id: "conv_1".into(),
            content: format!("Thought: {thought}"),
            metadata: HashMap::new(),
            created_at: Utc::now(),
            embedding: vec![],
            importance: 0.5,
            thought: thought.into(),
            action: "search_users".into(),
            observation: observation.into(),
            success: true,
        })
    }

    #[test]
    fn format_renders_trace_fields() {
        let rec = trace_record("resolve @alice", "found user_abc");
        let ctx = FormatContext {
            owner_id: "owner_1",
            query: "send to @alice",
            max_chars_per_record: 500,
        };
        let snippet = rec.format(&ctx);
        assert!(snippet.contains("resolve @alice"));
        assert!(snippet.contains("search_users"));
        assert!(snippet.contains("found user_abc"));
    }

    #[test]
    fn format_honours_budget() {
        let rec = trace_record(&"x".repeat(500), "long observation");
        let ctx = FormatContext {
            owner_id: "owner_1",
            query: "",
            max_chars_per_record: 100,
        };
        let snippet = rec.format(&ctx);
        assert!(snippet.chars().count() <= 100);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn set_embedding_replaces() {
        let mut rec = trace_record("t", "o");
        assert!(rec.embedding().is_empty());
        rec.set_embedding(vec![0.5, 0.5]);
        assert_eq!(rec.embedding(), &[0.5, 0.5]);
    }
}
