//! Vector store — per-owner collections with similarity queries.

use std::collections::HashMap;

use parking_lot::RwLock;

use la_domain::error::{Error, Result};

use crate::embed::dot;
use crate::record::MemoryRecord;

/// The shared partition visible to every owner.
pub const GLOBAL_OWNER: &str = "";

/// A query hit with its similarity score.
#[derive(Debug, Clone)]
pub struct Scored {
    pub record: MemoryRecord,
    pub similarity: f32,
}

/// Storage contract. Durable backends are free to replace the in-memory
/// reference implementation as long as owner partitioning holds.
pub trait VectorStore: Send + Sync {
    /// Persist a record. The embedding must already be present.
    fn store(&self, record: MemoryRecord) -> Result<()>;

    /// Top-`limit` records for this owner (plus globals), by similarity
    /// descending. Short or empty collections shrink the result; they
    /// never error.
    fn query(&self, owner_id: &str, embedding: &[f32], limit: usize) -> Result<Vec<Scored>>;
}

/// In-memory, single-process reference store. One collection per owner
/// behind a single writer lock; the sentinel `""` collection holds
/// globally visible records.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<MemoryRecord>>>,
    /// Per-owner record cap; oldest records are evicted past it.
    max_per_owner: Option<usize>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            max_per_owner: None,
        }
    }

    pub fn with_max_per_owner(mut self, max: usize) -> Self {
        self.max_per_owner = Some(max);
        self
    }

    pub fn len(&self, owner_id: &str) -> usize {
        self.collections
            .read()
            .get(owner_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, owner_id: &str) -> bool {
        self.len(owner_id) == 0
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn store(&self, record: MemoryRecord) -> Result<()> {
        if record.embedding().is_empty() {
            return Err(Error::Memory(format!(
                "record {} has no embedding",
                record.id()
            )));
        }

        let mut collections = self.collections.write();
        let collection = collections
            .entry(record.owner_id().to_string())
            .or_default();
        collection.push(record);

        if let Some(max) = self.max_per_owner {
            if collection.len() > max {
                // Evict oldest first.
                collection.sort_by_key(|r| r.created_at());
                let overflow = collection.len() - max;
                collection.drain(..overflow);
            }
        }
        Ok(())
    }

    fn query(&self, owner_id: &str, embedding: &[f32], limit: usize) -> Result<Vec<Scored>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let collections = self.collections.read();

        let mut scored: Vec<Scored> = Vec::new();
        let mut scan = |records: &Vec<MemoryRecord>| {
            for record in records {
                scored.push(Scored {
                    similarity: dot(embedding, record.embedding()),
                    record: record.clone(),
                });
            }
        };

        if let Some(own) = collections.get(owner_id) {
            scan(own);
        }
        if owner_id != GLOBAL_OWNER {
            if let Some(global) = collections.get(GLOBAL_OWNER) {
                scan(global);
            }
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TraceMemory;
    use chrono::{Duration, Utc};
    use std::collections::HashMap as StdHashMap;

    fn record(owner: &str, id: &str, embedding: Vec<f32>, age_secs: i64) -> MemoryRecord {
        MemoryRecord::Trace(TraceMemory {
            id: id.into(),
            owner_id: owner.into(),
            conversation_id: "conv_1".into(),
            content: "content".into(),
            metadata: StdHashMap::new(),
            created_at: Utc::now() - Duration::seconds(age_secs),
            embedding,
            importance: 0.5,
            thought: "t".into(),
            action: "a".into(),
            observation: "o".into(),
            success: true,
        })
    }

    #[test]
    fn store_requires_embedding() {
        let store = InMemoryVectorStore::new();
        let err = store.store(record("owner_1", "m1", vec![], 0)).unwrap_err();
        assert!(err.to_string().contains("no embedding"));
    }

    #[test]
    fn query_ranks_by_similarity_descending() {
        let store = InMemoryVectorStore::new();
        store.store(record("owner_1", "far", vec![0.0, 1.0], 0)).unwrap();
        store.store(record("owner_1", "near", vec![1.0, 0.0], 0)).unwrap();
        store
            .store(record("owner_1", "mid", vec![0.7071, 0.7071], 0))
            .unwrap();

        let hits = store.query("owner_1", &[1.0, 0.0], 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.record.id()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
    }

    #[test]
    fn owner_partitioning_is_absolute() {
        let store = InMemoryVectorStore::new();
        store.store(record("owner_a", "a1", vec![1.0, 0.0], 0)).unwrap();
        store.store(record("owner_b", "b1", vec![1.0, 0.0], 0)).unwrap();

        let hits = store.query("owner_a", &[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.owner_id(), "owner_a");
    }

    #[test]
    fn global_records_are_visible_to_all_owners() {
        let store = InMemoryVectorStore::new();
        store
            .store(record(GLOBAL_OWNER, "g1", vec![1.0, 0.0], 0))
            .unwrap();
        store.store(record("owner_a", "a1", vec![0.5, 0.5], 0)).unwrap();

        let hits = store.query("owner_a", &[1.0, 0.0], 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.record.id()).collect();
        assert!(ids.contains(&"g1"));
        assert!(ids.contains(&"a1"));

        // Querying the global partition itself does not pull owner records.
        let hits = store.query(GLOBAL_OWNER, &[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn short_collection_shrinks_limit_and_empty_is_ok() {
        let store = InMemoryVectorStore::new();
        assert!(store.query("nobody", &[1.0, 0.0], 5).unwrap().is_empty());

        store.store(record("owner_1", "m1", vec![1.0, 0.0], 0)).unwrap();
        let hits = store.query("owner_1", &[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn cap_evicts_oldest() {
        let store = InMemoryVectorStore::new().with_max_per_owner(2);
        store.store(record("owner_1", "old", vec![1.0, 0.0], 300)).unwrap();
        store.store(record("owner_1", "mid", vec![1.0, 0.0], 200)).unwrap();
        store.store(record("owner_1", "new", vec![1.0, 0.0], 100)).unwrap();

        assert_eq!(store.len("owner_1"), 2);
        let hits = store.query("owner_1", &[1.0, 0.0], 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.record.id()).collect();
        assert!(!ids.contains(&"old"));
    }
}
