//! The agent loop: model call → partition → tool dispatch → repeat.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use la_custodian::Custodian;
use la_domain::error::Result;
use la_domain::message::ContentBlock;
use la_domain::stream::Usage;
use la_domain::tool::{ToolOutcome, ToolParams};
use la_domain::trace::{Trace, AWAITING_CONFIRMATION};
use la_memory::{Interaction, MemoryManager};
use la_providers::{accumulate, ChatRequest, ChatResponse, ModelProvider, WireTool};
use la_tools::{Tool, ToolExecutor, ToolRegistry};

use crate::classify::{classify, prevention_hint};
use crate::config::{AgentInput, EngineConfig, Limits, RunOutcome};
use crate::hooks::{AuditEntry, AuditSink, GuardInput, Guardrails};
use crate::pending::PendingAction;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use crate::session::Session;

/// Fixed observation when a write tool fires in a context that cannot
/// confirm anything.
pub const CONFIRMATION_BLOCKED: &str =
    "Operation blocked: confirmation not allowed in this context";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AgentEngine {
    provider: Arc<dyn ModelProvider>,
    executor: ToolExecutor,
    memory: Option<Arc<dyn MemoryManager>>,
    guardrails: Option<Arc<dyn Guardrails>>,
    audit: Option<Arc<dyn AuditSink>>,
    config: EngineConfig,
}

/// Why a model call or tool dispatch did not return a value.
enum Abort {
    /// Deadline or ambient cancellation.
    TimedOut,
}

impl AgentEngine {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<ToolRegistry>,
        custodian: Arc<dyn Custodian>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            executor: ToolExecutor::new(registry, custodian),
            memory: None,
            guardrails: None,
            audit: None,
            config,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryManager>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_guardrails(mut self, guardrails: Arc<dyn Guardrails>) -> Self {
        self.guardrails = Some(guardrails);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // run — the primary entry point
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn run(&self, input: AgentInput) -> RunOutcome {
        let limits = input
            .limits
            .clone()
            .unwrap_or_else(|| self.config.limits.clone());
        let deadline = limits.timeout.map(|t| tokio::time::Instant::now() + t);
        let cancel = input.cancel.clone().unwrap_or_default();
        let mut usage = Usage::default();

        // ── Phase 0: admission ──────────────────────────────────────
        if let Some(guardrails) = &self.guardrails {
            let verdict = guardrails
                .check(GuardInput {
                    owner_id: &input.owner_id,
                    conversation_id: &input.conversation_id,
                    user_text: input.user_text.as_deref().unwrap_or(""),
                })
                .await;
            match verdict {
                Ok(admission) if admission.allowed => {}
                Ok(admission) => {
                    let reason = admission.reason.unwrap_or_else(|| "request denied".into());
                    return RunOutcome::Error {
                        message: format!("admission denied: {reason}"),
                        usage,
                    };
                }
                Err(e) => {
                    // A broken guardrail fails closed.
                    return RunOutcome::Error {
                        message: format!("admission denied: guardrails error: {e}"),
                        usage,
                    };
                }
            }
        }

        // ── Phase 1: enrichment (non-fatal) ─────────────────────────
        let mut system_prompt = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        if let (Some(memory), Some(user_text)) = (&self.memory, &input.user_text) {
            let enrichment = memory.retrieve(&input.owner_id, user_text).await;
            if !enrichment.is_empty() {
                system_prompt.push_str("\n\n");
                system_prompt.push_str(&enrichment);
            }
        }

        // ── Phase 2: session bootstrap ──────────────────────────────
        let mut session = Session::new(input.owner_id.as_str(), input.conversation_id.as_str());
        session.restore_history(&input.history);
        if let Some(user_text) = &input.user_text {
            session.add_user(user_text);
        }

        let wire_tools = self
            .registry()
            .wire_tools(self.config.available_tools.as_deref());

        // ── The loop ────────────────────────────────────────────────
        loop {
            let turn = session.begin_turn();
            if turn > limits.max_turns {
                return RunOutcome::Error {
                    message: format!("exceeded maximum turns ({})", limits.max_turns),
                    usage,
                };
            }

            let response = match self
                .call_model(&system_prompt, &session, &wire_tools, &limits, deadline, &cancel)
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    return RunOutcome::Error {
                        message: format!("model call failed: {e}"),
                        usage,
                    }
                }
                Err(Abort::TimedOut) => {
                    return RunOutcome::Error {
                        message: "timed out".into(),
                        usage,
                    }
                }
            };
            usage.add(response.usage);
            session.record_usage(response.usage);

            // ── Partition the response ──────────────────────────────
            let tool_uses: Vec<(String, String, Value)> = response
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            // ── Terminal text ───────────────────────────────────────
            if tool_uses.is_empty() {
                let text = response.text();
                session.add_assistant_response(response.content);

                if let Some(guardrails) = &self.guardrails {
                    guardrails
                        .notify_success(
                            &input.owner_id,
                            input.user_text.as_deref().unwrap_or(""),
                            &text,
                        )
                        .await;
                }
                self.dispatch_memory_record(&input, &session, &text);

                return RunOutcome::Complete {
                    text,
                    traces: session.traces,
                    usage,
                };
            }

            // ── Tool dispatch, in emission order ────────────────────
            let mut result_blocks: Vec<ContentBlock> = Vec::new();
            for (block_id, name, tool_input) in tool_uses {
                // Malformed input: tell the model and keep going.
                if !tool_input.is_object() {
                    result_blocks.push(ContentBlock::tool_result(
                        block_id.clone(),
                        format!("invalid tool input for {name}: expected a JSON object"),
                        true,
                    ));
                    continue;
                }

                let Some(tool) = self.registry().get(&name) else {
                    result_blocks.push(ContentBlock::tool_result(
                        block_id.clone(),
                        format!("unknown tool: {name}"),
                        true,
                    ));
                    continue;
                };

                let thought = tool_input
                    .get("thought")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .trim()
                    .to_string();
                if tool.requires_confirmation() && thought.is_empty() {
                    result_blocks.push(ContentBlock::tool_result(
                        block_id.clone(),
                        format!(
                            "The {name} tool requires a non-empty 'thought' field: explain in \
                             one sentence why this action should run, so the user can review \
                             it. Re-issue the call with the thought filled in."
                        ),
                        true,
                    ));
                    continue;
                }

                // THINK recorded; now decide how to act.
                let mut trace = Trace::begin(
                    session.id.clone(),
                    turn,
                    thought.clone(),
                    name.clone(),
                    tool_input.clone(),
                );

                if tool.requires_confirmation() {
                    if !limits.can_confirm {
                        trace.complete(CONFIRMATION_BLOCKED, false);
                        session.add_trace(trace);
                        result_blocks.push(ContentBlock::tool_result(
                            block_id.clone(),
                            CONFIRMATION_BLOCKED,
                            true,
                        ));
                        continue;
                    }

                    // Suspend: hand the caller a resumable pending action.
                    let summary = self.registry().summary_of(&tool, &tool_input);
                    let pending = PendingAction::new(
                        session.id.clone(),
                        input.owner_id.clone(),
                        name,
                        tool_input,
                        thought,
                        summary,
                        block_id,
                    );
                    trace.complete(AWAITING_CONFIRMATION, false);
                    session.add_trace(trace);
                    session.add_assistant_response(response.content);
                    session.add_tool_results(result_blocks);
                    return RunOutcome::ConfirmationNeeded {
                        pending,
                        messages: session.messages,
                        traces: session.traces,
                        usage,
                    };
                }

                // ── ACT (read-only) ─────────────────────────────────
                let request_id = Uuid::new_v4().to_string();
                let params = ToolParams {
                    owner_id: input.owner_id.clone(),
                    input: tool_input.clone(),
                    request_id: request_id.clone(),
                    confirmation_id: None,
                };
                let started = Instant::now();
                let outcome = match with_deadline(
                    &cancel,
                    deadline,
                    self.executor.execute(&name, params),
                )
                .await
                {
                    Some(Ok(outcome)) => outcome,
                    // Transport failures become tool failures; the run
                    // survives every per-block error.
                    Some(Err(e)) => ToolOutcome::err(e.to_string()),
                    None => {
                        trace.complete("timed out", false);
                        session.add_trace(trace);
                        return RunOutcome::Error {
                            message: "timed out".into(),
                            usage,
                        };
                    }
                };
                let duration_ms = started.elapsed().as_millis() as u64;

                // ── OBSERVE ─────────────────────────────────────────
                let observation = format_observation(&tool, &outcome);
                if !outcome.success {
                    let error_text = outcome.error.as_deref().unwrap_or(&observation);
                    let category = classify(error_text);
                    trace.set_meta("error_category", category.as_str());
                    if let Some(hint) = prevention_hint(&name, category) {
                        trace.set_meta("prevention", hint);
                    }
                }
                if outcome.requires_confirmation {
                    trace.set_meta("collaborator_confirmation", "true");
                }
                trace.complete(observation.clone(), outcome.success);
                session.add_trace(trace);
                session.note_tool_used(&name);

                self.emit_audit(
                    &input,
                    &session,
                    &request_id,
                    &name,
                    &tool_input,
                    &observation,
                    outcome.error.as_deref(),
                    duration_ms,
                    false,
                )
                .await;

                result_blocks.push(ContentBlock::tool_result(
                    block_id.clone(),
                    observation,
                    !outcome.success,
                ));
            }

            session.add_assistant_response(response.content);
            session.add_tool_results(result_blocks);
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // run_confirmed — resumption after human approval
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn run_confirmed(&self, input: AgentInput, pending: PendingAction) -> RunOutcome {
        let limits = input
            .limits
            .clone()
            .unwrap_or_else(|| self.config.limits.clone());
        let deadline = limits.timeout.map(|t| tokio::time::Instant::now() + t);
        let cancel = input.cancel.clone().unwrap_or_default();
        let mut usage = Usage::default();

        if pending.is_expired() {
            return RunOutcome::Error {
                message: format!("pending action {} has expired", pending.id),
                usage,
            };
        }
        if pending.owner_id != input.owner_id {
            return RunOutcome::Error {
                message: "pending action does not belong to this owner".into(),
                usage,
            };
        }

        let mut session = Session::new(input.owner_id.as_str(), input.conversation_id.as_str());
        session.restore_history(&input.history);
        let turn = session.begin_turn();

        let mut trace = Trace::begin(
            session.id.clone(),
            turn,
            pending.thought.clone(),
            pending.tool.clone(),
            pending.input.clone(),
        );
        trace.set_meta("confirmed", "true");
        trace.set_meta("confirmation_id", pending.id.clone());

        // Confirmed by the human: the write path runs with an empty
        // confirmation id.
        let request_id = Uuid::new_v4().to_string();
        let params = ToolParams {
            owner_id: input.owner_id.clone(),
            input: pending.input.clone(),
            request_id: request_id.clone(),
            confirmation_id: Some(String::new()),
        };
        let started = Instant::now();
        let outcome = match with_deadline(
            &cancel,
            deadline,
            self.executor.execute_write(&pending.tool, params),
        )
        .await
        {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => ToolOutcome::err(e.to_string()),
            None => {
                return RunOutcome::Error {
                    message: "timed out".into(),
                    usage,
                }
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let tool = self.registry().get(&pending.tool);
        let observation = match &tool {
            Some(tool) => format_observation(tool, &outcome),
            None => default_observation(&outcome),
        };
        if !outcome.success {
            let error_text = outcome.error.as_deref().unwrap_or(&observation);
            let category = classify(error_text);
            trace.set_meta("error_category", category.as_str());
            if let Some(hint) = prevention_hint(&pending.tool, category) {
                trace.set_meta("prevention", hint);
            }
        }
        trace.complete(observation.clone(), outcome.success);
        session.add_trace(trace);
        session.note_tool_used(&pending.tool);

        self.emit_audit(
            &input,
            &session,
            &request_id,
            &pending.tool,
            &pending.input,
            &observation,
            outcome.error.as_deref(),
            duration_ms,
            true,
        )
        .await;

        // Feed the result back under the original tool-use block, then
        // make exactly one closing model call.
        session.add_tool_results(vec![ContentBlock::tool_result(
            pending.block_id.clone(),
            observation,
            !outcome.success,
        )]);

        let system_prompt = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let wire_tools = self
            .registry()
            .wire_tools(self.config.available_tools.as_deref());
        let response = match self
            .call_model(&system_prompt, &session, &wire_tools, &limits, deadline, &cancel)
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return RunOutcome::Error {
                    message: format!("model call failed: {e}"),
                    usage,
                }
            }
            Err(Abort::TimedOut) => {
                return RunOutcome::Error {
                    message: "timed out".into(),
                    usage,
                }
            }
        };
        usage.add(response.usage);
        session.record_usage(response.usage);

        let text = response.text();
        session.add_assistant_response(response.content);
        self.dispatch_memory_record(&input, &session, &text);

        RunOutcome::Complete {
            text,
            traces: session.traces,
            usage,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Helpers
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn call_model(
        &self,
        system: &str,
        session: &Session,
        tools: &[WireTool],
        limits: &Limits,
        deadline: Option<tokio::time::Instant>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Result<ChatResponse>, Abort> {
        let request = ChatRequest {
            model: self.config.model_id.clone(),
            max_tokens: limits.max_tokens,
            system: system.to_string(),
            messages: session.messages.clone(),
            tools: tools.to_vec(),
        };

        let span = tracing::info_span!(
            "model.call",
            session_id = %session.id,
            turn = session.turn_count,
        );

        match &self.config.stream_callback {
            Some(callback) => {
                let callback = callback.clone();
                let fut = async move {
                    let stream = self.provider.chat_stream(request).await?;
                    let (message, usage) =
                        accumulate::accumulate(stream, |delta| callback(delta)).await?;
                    Ok(ChatResponse {
                        content: message.content,
                        usage,
                        stop_reason: None,
                    })
                };
                with_deadline(cancel, deadline, fut.instrument(span))
                    .await
                    .ok_or(Abort::TimedOut)
            }
            None => {
                with_deadline(cancel, deadline, self.provider.chat(request).instrument(span))
                    .await
                    .ok_or(Abort::TimedOut)
            }
        }
    }

    /// Fire-and-forget memory recording. Dispatched once the final
    /// outcome is assembled; a run never blocks on memory writes.
    fn dispatch_memory_record(&self, input: &AgentInput, session: &Session, final_text: &str) {
        let Some(memory) = &self.memory else {
            return;
        };
        if session.traces.is_empty() {
            return;
        }
        let memory = memory.clone();
        let owner_id = input.owner_id.clone();
        let interaction = Interaction {
            conversation_id: input.conversation_id.clone(),
            user_text: input.user_text.clone().unwrap_or_default(),
            assistant_text: final_text.to_string(),
            traces: session.traces.clone(),
        };
        tokio::spawn(async move {
            memory.record(&owner_id, interaction).await;
        });
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_audit(
        &self,
        input: &AgentInput,
        session: &Session,
        request_id: &str,
        tool_name: &str,
        tool_input: &Value,
        tool_output: &str,
        error: Option<&str>,
        duration_ms: u64,
        is_write_op: bool,
    ) {
        let Some(audit) = &self.audit else {
            return;
        };
        audit
            .record(AuditEntry {
                id: Uuid::new_v4().to_string(),
                owner_id: input.owner_id.clone(),
                session_id: session.id.clone(),
                request_id: request_id.to_string(),
                parent_id: None,
                agent_name: self.config.agent_name.clone(),
                tool_name: tool_name.to_string(),
                tool_input: tool_input.clone(),
                tool_output: tool_output.to_string(),
                error: error.map(String::from),
                duration_ms,
                is_write_op,
                timestamp: chrono::Utc::now(),
            })
            .await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observation formatting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tool formatter first, then the default rendering.
fn format_observation(tool: &Tool, outcome: &ToolOutcome) -> String {
    tool.format_observation(outcome)
        .unwrap_or_else(|| default_observation(outcome))
}

/// Default observation: error message, empty-result placeholder, bare
/// string value, or the JSON form of structured data.
fn default_observation(outcome: &ToolOutcome) -> String {
    if !outcome.success {
        return outcome
            .error
            .clone()
            .unwrap_or_else(|| "tool execution failed".into());
    }
    match &outcome.data {
        Value::Null => "(no result)".into(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Run a future against the deadline and the ambient cancellation
/// signal. `None` means the run is out of time.
async fn with_deadline<F, T>(
    cancel: &CancellationToken,
    deadline: Option<tokio::time::Instant>,
    fut: F,
) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    let expiry = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => None,
        _ = expiry => None,
        out = fut => Some(out),
    }
}
