use crate::error::Result;
use crate::session::{RecordStorage, SessionRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory durable store using DashMap
///
/// Suitable for tests and single-process deployments; records are lost on
/// restart. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryRecordStorage {
    records: Arc<DashMap<String, SessionRecord>>,
}

impl MemoryRecordStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired ones included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStorage for MemoryRecordStorage {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let record = self.records.get(session_id).map(|r| r.value().clone());
        log::debug!(
            "MemoryStorage: session {} {}",
            session_id,
            if record.is_some() { "found" } else { "not found" }
        );
        Ok(record)
    }

    async fn put(&self, record: &SessionRecord) -> Result<()> {
        // Keep the first creation time when overwriting
        let mut stored = record.clone();
        if let Some(existing) = self.records.get(&record.session_id) {
            stored.created = existing.created;
        }
        log::debug!(
            "MemoryStorage: storing session {} with {} data entries",
            stored.session_id,
            stored.data.len()
        );
        self.records.insert(stored.session_id.clone(), stored);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.records.remove(session_id);
        Ok(())
    }

    async fn cleanup_expired(&self, created_before: u64) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        self.records.retain(|session_id, record| {
            let keep = record.created >= created_before;
            if !keep {
                removed.push(session_id.clone());
            }
            keep
        });
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
