//! Engine configuration, run input, and run outcome types.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use la_domain::message::Message;
use la_domain::stream::Usage;
use la_domain::trace::Trace;

use crate::pending::PendingAction;

/// Receives text deltas while the model streams.
pub type StreamCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-run execution limits.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_turns: u32,
    /// Token cap per model call.
    pub max_tokens: u32,
    /// Wall-clock budget for the whole run.
    pub timeout: Option<Duration>,
    /// When false, confirmation-required tools are blocked outright
    /// (non-interactive contexts cannot confirm anything).
    pub can_confirm: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_turns: 20,
            max_tokens: 4096,
            timeout: None,
            can_confirm: true,
        }
    }
}

/// Engine-level configuration.
#[derive(Clone)]
pub struct EngineConfig {
    /// Model identifier passed through to the provider. Empty = provider
    /// default.
    pub model_id: String,
    /// Overrides the built-in system prompt when set.
    pub system_prompt: Option<String>,
    /// Appears in audit entries.
    pub agent_name: String,
    /// Allow-list of tool names exposed to the model. `None` = all.
    pub available_tools: Option<Vec<String>>,
    pub stream_callback: Option<StreamCallback>,
    pub limits: Limits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            system_prompt: None,
            agent_name: "ledger-agent".into(),
            available_tools: None,
            stream_callback: None,
            limits: Limits::default(),
        }
    }
}

/// One run request.
#[derive(Clone, Default)]
pub struct AgentInput {
    pub owner_id: String,
    pub conversation_id: String,
    /// The new user message. Absent on confirmation resumption, where
    /// the history already ends with the suspended exchange.
    pub user_text: Option<String>,
    /// Prior conversation, replayed verbatim into the session.
    pub history: Vec<Message>,
    /// Overrides the engine-level limits for this run.
    pub limits: Option<Limits>,
    /// Ambient cancellation; a fresh token is used when absent.
    pub cancel: Option<CancellationToken>,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Terminal assistant text.
    Complete {
        text: String,
        traces: Vec<Trace>,
        usage: Usage,
    },
    /// A write tool suspended the run; the caller must persist the
    /// pending action and the session messages, and later resume via
    /// `run_confirmed` with that history.
    ConfirmationNeeded {
        pending: PendingAction,
        /// The full session log up to the suspension, ending with the
        /// assistant message that carries the suspended tool-use block.
        messages: Vec<Message>,
        traces: Vec<Trace>,
        usage: Usage,
    },
    /// The run aborted: admission denial, provider failure, turn limit,
    /// or deadline. Usage covers everything up to the abort.
    Error { message: String, usage: Usage },
}

impl RunOutcome {
    pub fn usage(&self) -> Usage {
        match self {
            RunOutcome::Complete { usage, .. }
            | RunOutcome::ConfirmationNeeded { usage, .. }
            | RunOutcome::Error { usage, .. } => *usage,
        }
    }

    /// The terminal text, when the run completed.
    pub fn text(&self) -> Option<&str> {
        match self {
            RunOutcome::Complete { text, .. } => Some(text),
            _ => None,
        }
    }
}
