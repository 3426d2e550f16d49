//! Per-run conversation state.
//!
//! Mutated only by the engine during a single run. Messages and traces
//! are append-only; block ids on assistant responses are preserved
//! verbatim because confirmation resumption matches tool results back
//! to the original tool-use block.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use la_domain::message::{ContentBlock, Message};
use la_domain::stream::Usage;
use la_domain::trace::Trace;

pub struct Session {
    pub id: String,
    pub owner_id: String,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub traces: Vec<Trace>,
    pub turn_count: u32,
    pub usage: Usage,
    /// Names of tools executed during this run, in execution order.
    pub tools_used: Vec<String>,
}

impl Session {
    pub fn new(owner_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            conversation_id: conversation_id.into(),
            created_at: Utc::now(),
            messages: Vec::new(),
            traces: Vec::new(),
            turn_count: 0,
            usage: Usage::default(),
            tools_used: Vec::new(),
        }
    }

    /// Replay a prior conversation verbatim. Produces no traces.
    pub fn restore_history(&mut self, history: &[Message]) {
        self.messages.extend_from_slice(history);
    }

    pub fn add_user(&mut self, text: &str) {
        self.messages.push(Message::user(text));
    }

    /// Record a model response — visible text and tool-use blocks, with
    /// the model-emitted block ids untouched.
    pub fn add_assistant_response(&mut self, content: Vec<ContentBlock>) {
        self.messages.push(Message::assistant_blocks(content));
    }

    /// Append one batch of tool results in dispatch order. Empty batches
    /// are skipped.
    pub fn add_tool_results(&mut self, blocks: Vec<ContentBlock>) {
        if !blocks.is_empty() {
            self.messages.push(Message::tool_results(blocks));
        }
    }

    pub fn add_trace(&mut self, trace: Trace) {
        self.traces.push(trace);
    }

    pub fn note_tool_used(&mut self, name: &str) {
        self.tools_used.push(name.to_string());
    }

    /// Advance to the next turn and return its number.
    pub fn begin_turn(&mut self) -> u32 {
        self.turn_count += 1;
        self.turn_count
    }

    pub fn record_usage(&mut self, usage: Usage) {
        self.usage.add(usage);
    }
}
