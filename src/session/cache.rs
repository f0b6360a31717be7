use crate::cache::{Cache, CacheConfig, MemoryCache};
use crate::error::Result;
use crate::session::SessionCache;
use async_trait::async_trait;
use std::time::Duration;

/// In-process session cache backed by [`MemoryCache`]
#[derive(Clone, Default)]
pub struct MemorySessionCache {
    entries: MemoryCache<String>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: MemoryCache::with_config(CacheConfig {
                max_entries,
                default_ttl: None,
            }),
        }
    }

    /// Underlying cache, for statistics
    pub fn inner(&self) -> &MemoryCache<String> {
        &self.entries
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, session_id: &str) -> Result<Option<String>> {
        Ok(self.entries.get(session_id))
    }

    async fn set(&self, session_id: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries.put(session_id.to_string(), value, Some(ttl))
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.entries.remove(session_id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
