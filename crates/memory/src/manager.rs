//! Memory manager — decides what to record and renders enrichment.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use la_domain::trace::Trace;

use crate::embed::Embedder;
use crate::record::{FormatContext, MemoryRecord, TraceMemory};
use crate::store::{Scored, VectorStore};

/// Header prefixed to every enrichment block.
pub const ENRICHMENT_HEADER: &str = "=== RELEVANT PAST ACTIONS ===";

/// Character budget shared by all rendered records.
const ENRICHMENT_BUDGET: usize = 2000;
const MIN_CHARS_PER_RECORD: usize = 100;

/// Top-K candidates pulled per retrieval.
const RETRIEVAL_LIMIT: usize = 10;

/// Thought lengths that make a single trace worth keeping / extra salient.
const THOUGHT_STORE_THRESHOLD: usize = 30;
const THOUGHT_IMPORTANCE_THRESHOLD: usize = 50;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config & contract
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub enabled: bool,
    /// Candidates scoring below this are dropped from enrichment.
    pub min_similarity: f32,
    pub max_memories_per_owner: Option<usize>,
    /// Age-discount retrieval scores (7-day half-life).
    pub decay_enabled: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_similarity: 0.0,
            max_memories_per_owner: None,
            decay_enabled: false,
        }
    }
}

/// One completed run, as handed to [`MemoryManager::record`].
#[derive(Debug, Clone)]
pub struct Interaction {
    pub conversation_id: String,
    pub user_text: String,
    pub assistant_text: String,
    pub traces: Vec<Trace>,
}

/// Public memory contract used by the engine.
#[async_trait]
pub trait MemoryManager: Send + Sync {
    /// Render the enrichment block for a new run. Empty string when
    /// there is nothing relevant (or memory is disabled).
    async fn retrieve(&self, owner_id: &str, user_text: &str) -> String;

    /// Record whatever the policy keeps from a finished run. Never
    /// fails the caller; storage problems are logged and skipped.
    async fn record(&self, owner_id: &str, interaction: Interaction);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SimpleMemoryManager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Default recording policy:
/// - multi-trace runs are always stored (every trace);
/// - a single trace is stored when it failed, was confirmed, names a
///   contextually valuable action, or carries a substantial thought;
/// - everything else is dropped.
pub struct SimpleMemoryManager {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: MemoryConfig,
    /// Actions worth remembering even as single quiet successes. Policy,
    /// not contract — override per deployment.
    valuable_actions: HashSet<String>,
}

impl SimpleMemoryManager {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: MemoryConfig,
    ) -> Self {
        let valuable_actions = [
            "search_users",
            "get_profile",
            "get_transactions",
            "analyze_spending",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        Self {
            embedder,
            store,
            config,
            valuable_actions,
        }
    }

    pub fn with_valuable_actions(mut self, actions: impl IntoIterator<Item = String>) -> Self {
        self.valuable_actions = actions.into_iter().collect();
        self
    }

    fn should_store(&self, trace: &Trace, trace_count: usize) -> bool {
        if trace_count > 1 {
            return true;
        }
        if !trace.success {
            return true;
        }
        if trace.metadata.get("confirmed").map(String::as_str) == Some("true") {
            return true;
        }
        if self.valuable_actions.contains(&trace.action) {
            return true;
        }
        trace.thought.chars().count() > THOUGHT_STORE_THRESHOLD
    }

    fn importance(trace: &Trace) -> f32 {
        let mut score: f32 = 0.5;
        if !trace.success {
            score += 0.3;
        }
        if trace.metadata.get("confirmed").map(String::as_str) == Some("true") {
            score += 0.2;
        }
        if trace.thought.chars().count() > THOUGHT_IMPORTANCE_THRESHOLD {
            score += 0.1;
        }
        score.min(1.0)
    }

    fn decay_factor(&self, record: &MemoryRecord) -> f32 {
        if !self.config.decay_enabled {
            return 1.0;
        }
        let age_days = (Utc::now() - record.created_at()).num_seconds().max(0) as f32 / 86_400.0;
        0.5f32.powf(age_days / 7.0)
    }

    fn to_memory(&self, owner_id: &str, conversation_id: &str, trace: &Trace) -> TraceMemory {
        let content = format!(
            "Thought: {}\nAction: {}\nObservation: {}",
            trace.thought, trace.action, trace.observation
        );
        TraceMemory {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            conversation_id: conversation_id.to_string(),
            content,
            metadata: trace.metadata.clone(),
            created_at: Utc::now(),
            embedding: Vec::new(),
            importance: Self::importance(trace),
            thought: trace.thought.clone(),
            action: trace.action.clone(),
            observation: trace.observation.clone(),
            success: trace.success,
        }
    }
}

#[async_trait]
impl MemoryManager for SimpleMemoryManager {
    async fn retrieve(&self, owner_id: &str, user_text: &str) -> String {
        if !self.config.enabled {
            return String::new();
        }

        let embedding = match self.embedder.embed(user_text).await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "memory retrieval embedding failed");
                return String::new();
            }
        };

        let candidates = match self.store.query(owner_id, &embedding, RETRIEVAL_LIMIT) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "memory query failed");
                return String::new();
            }
        };

        let mut kept: Vec<Scored> = candidates
            .into_iter()
            .map(|mut s| {
                s.similarity *= self.decay_factor(&s.record);
                s
            })
            .filter(|s| s.similarity >= self.config.min_similarity)
            .collect();
        if kept.is_empty() {
            return String::new();
        }
        kept.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let per_record = (ENRICHMENT_BUDGET / kept.len()).max(MIN_CHARS_PER_RECORD);
        let ctx = FormatContext {
            owner_id,
            query: user_text,
            max_chars_per_record: per_record,
        };

        let mut out = String::from(ENRICHMENT_HEADER);
        for scored in &kept {
            out.push('\n');
            out.push_str(&scored.record.format(&ctx));
        }
        out
    }

    async fn record(&self, owner_id: &str, interaction: Interaction) {
        let count = interaction.traces.len();
        for trace in &interaction.traces {
            if !self.should_store(trace, count) {
                continue;
            }
            let mut memory = self.to_memory(owner_id, &interaction.conversation_id, trace);
            match self.embedder.embed(&memory.content).await {
                Ok(embedding) => memory.embedding = embedding,
                Err(e) => {
                    tracing::warn!(error = %e, action = %trace.action, "memory embedding failed; skipping");
                    continue;
                }
            }
            if let Err(e) = self.store.store(MemoryRecord::Trace(memory)) {
                tracing::warn!(error = %e, action = %trace.action, "memory store failed; skipping");
            }
        }
    }
}

/// Convenience for wiring a capped store from config.
pub fn store_from_config(config: &MemoryConfig) -> Arc<dyn VectorStore> {
    let store = match config.max_memories_per_owner {
        Some(max) => crate::store::InMemoryVectorStore::new().with_max_per_owner(max),
        None => crate::store::InMemoryVectorStore::new(),
    };
    Arc::new(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::store::InMemoryVectorStore;
    use serde_json::json;

    fn manager() -> (SimpleMemoryManager, Arc<InMemoryVectorStore>) {
        let store = Arc::new(InMemoryVectorStore::new());
        let manager = SimpleMemoryManager::new(
            Arc::new(HashEmbedder::default()),
            store.clone(),
            MemoryConfig::default(),
        );
        (manager, store)
    }

    fn trace(action: &str, thought: &str, observation: &str, success: bool) -> Trace {
        let mut t = Trace::begin("sess_1", 1, thought, action, json!({}));
        t.complete(observation, success);
        t
    }

    fn interaction(traces: Vec<Trace>) -> Interaction {
        Interaction {
            conversation_id: "conv_1".into(),
            user_text: "user text".into(),
            assistant_text: "assistant text".into(),
            traces,
        }
    }

    // ── filter policy ──────────────────────────────────────────────

    #[tokio::test]
    async fn multi_trace_runs_are_always_stored() {
        let (manager, store) = manager();
        manager
            .record(
                "owner_1",
                interaction(vec![
                    trace("get_balance", "", "ok", true),
                    trace("get_balance", "", "ok", true),
                ]),
            )
            .await;
        assert_eq!(store.len("owner_1"), 2);
    }

    #[tokio::test]
    async fn single_quiet_success_is_dropped() {
        let (manager, store) = manager();
        manager
            .record(
                "owner_1",
                interaction(vec![trace("get_balance", "brief", "ok", true)]),
            )
            .await;
        assert_eq!(store.len("owner_1"), 0);
    }

    #[tokio::test]
    async fn single_failure_is_stored() {
        let (manager, store) = manager();
        manager
            .record(
                "owner_1",
                interaction(vec![trace("send_money", "", "insufficient balance", false)]),
            )
            .await;
        assert_eq!(store.len("owner_1"), 1);
    }

    #[tokio::test]
    async fn single_confirmed_trace_is_stored() {
        let (manager, store) = manager();
        let mut t = trace("send_money", "", "sent", true);
        t.metadata.insert("confirmed".into(), "true".into());
        manager.record("owner_1", interaction(vec![t])).await;
        assert_eq!(store.len("owner_1"), 1);
    }

    #[tokio::test]
    async fn single_valuable_action_is_stored() {
        let (manager, store) = manager();
        manager
            .record(
                "owner_1",
                interaction(vec![trace("search_users", "", "found user_abc", true)]),
            )
            .await;
        assert_eq!(store.len("owner_1"), 1);
    }

    #[tokio::test]
    async fn single_long_thought_is_stored() {
        let (manager, store) = manager();
        let long_thought = "the user wants their running balance before paying rent";
        manager
            .record(
                "owner_1",
                interaction(vec![trace("get_balance", long_thought, "ok", true)]),
            )
            .await;
        assert_eq!(store.len("owner_1"), 1);
    }

    // ── importance ─────────────────────────────────────────────────

    #[test]
    fn importance_scoring() {
        let base = trace("get_balance", "hm", "ok", true);
        assert_eq!(SimpleMemoryManager::importance(&base), 0.5);

        let failure = trace("send_money", "hm", "error", false);
        assert!((SimpleMemoryManager::importance(&failure) - 0.8).abs() < 1e-6);

        let mut confirmed_failure = trace("send_money", &"t".repeat(60), "error", false);
        confirmed_failure
            .metadata
            .insert("confirmed".into(), "true".into());
        // 0.5 + 0.3 + 0.2 + 0.1 clamps to 1.0.
        assert_eq!(SimpleMemoryManager::importance(&confirmed_failure), 1.0);
    }

    // ── retrieval ──────────────────────────────────────────────────

    #[tokio::test]
    async fn retrieve_renders_header_and_snippets() {
        let (manager, _store) = manager();
        manager
            .record(
                "owner_1",
                interaction(vec![
                    trace("search_users", "resolve @alice", "found user_abc", true),
                    trace("send_money", "user asked to send", "sent $50 to user_abc", true),
                ]),
            )
            .await;

        let enrichment = manager.retrieve("owner_1", "Send $100 to @alice again").await;
        assert!(enrichment.starts_with(ENRICHMENT_HEADER));
        assert!(enrichment.contains("@alice"));
        assert!(enrichment.contains("user_abc"));
    }

    #[tokio::test]
    async fn retrieve_empty_store_returns_empty() {
        let (manager, _store) = manager();
        assert_eq!(manager.retrieve("owner_1", "anything").await, "");
    }

    #[tokio::test]
    async fn retrieve_disabled_returns_empty() {
        let store = Arc::new(InMemoryVectorStore::new());
        let manager = SimpleMemoryManager::new(
            Arc::new(HashEmbedder::default()),
            store,
            MemoryConfig {
                enabled: false,
                ..Default::default()
            },
        );
        assert_eq!(manager.retrieve("owner_1", "anything").await, "");
    }

    #[tokio::test]
    async fn retrieve_is_owner_partitioned() {
        let (manager, _store) = manager();
        manager
            .record(
                "owner_a",
                interaction(vec![trace("search_users", "resolve @alice", "user_abc", true)]),
            )
            .await;

        let enrichment = manager.retrieve("owner_b", "who is @alice").await;
        assert!(enrichment.is_empty());
    }

    #[tokio::test]
    async fn decay_discounts_old_records() {
        use crate::record::TraceMemory;
        use crate::store::VectorStore;

        let embedder = Arc::new(HashEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new());
        let content = "Thought: resolve @alice\nAction: search_users\nObservation: user_abc";
        let embedding = embedder.embed(content).await.unwrap();

        let mut old = TraceMemory {
            id: "old".into(),
            owner_id: "owner_1".into(),
            conversation_id: "conv_1".into(),
            content: content.into(),
            metadata: HashMap::new(),
            created_at: Utc::now() - chrono::Duration::days(70),
            embedding: embedding.clone(),
            importance: 0.5,
            thought: "resolve @alice".into(),
            action: "search_users".into(),
            observation: "user_abc".into(),
            success: true,
        };
        store.store(MemoryRecord::Trace(old.clone())).unwrap();

        // Same content, fresh timestamp.
        old.id = "fresh".into();
        old.created_at = Utc::now();
        store.store(MemoryRecord::Trace(old)).unwrap();

        let manager = SimpleMemoryManager::new(
            embedder,
            store,
            MemoryConfig {
                decay_enabled: true,
                min_similarity: 0.5,
                ..Default::default()
            },
        );

        // Ten half-lives flatten the old record below the similarity
        // floor; the fresh copy survives.
        let enrichment = manager.retrieve("owner_1", content).await;
        assert!(enrichment.contains("search_users"));
        let record_lines = enrichment.lines().count() - 1;
        assert_eq!(record_lines, 1);
    }

    #[tokio::test]
    async fn min_similarity_filters_noise() {
        let store = Arc::new(InMemoryVectorStore::new());
        let manager = SimpleMemoryManager::new(
            Arc::new(HashEmbedder::default()),
            store,
            MemoryConfig {
                min_similarity: 0.99,
                ..Default::default()
            },
        );
        manager
            .record(
                "owner_1",
                interaction(vec![trace("search_users", "resolve @alice", "user_abc", true)]),
            )
            .await;
        // Nothing is near-identical to this query.
        let enrichment = manager.retrieve("owner_1", "completely unrelated topic").await;
        assert!(enrichment.is_empty());
    }
}
