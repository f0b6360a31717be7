//! In-memory cache with LRU eviction and TTL support
use super::{Cache, CacheConfig, CacheEntry, CacheKey, CacheStats};
use crate::error::{Error, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Thread-safe in-memory cache, cheap to clone (clones share storage)
pub struct MemoryCache<T: Clone> {
    data: Arc<RwLock<HashMap<CacheKey, CacheEntry<T>>>>,
    config: CacheConfig,
    stats: Arc<RwLock<CacheStats>>,
}

impl<T: Clone> MemoryCache<T> {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            config,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self::with_config(CacheConfig {
            max_entries,
            ..CacheConfig::default()
        })
    }

    fn update_stats(&self, f: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            f(&mut stats);
        }
    }

    /// Evict the entry with the oldest access time
    fn evict_lru(&self, data: &mut HashMap<CacheKey, CacheEntry<T>>) {
        let lru_key = data
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());

        if let Some(key) = lru_key {
            data.remove(&key);
            self.update_stats(|s| s.evictions += 1);
            debug!("Evicted LRU cache entry: {}", key);
        }
    }
}

impl<T: Clone> Cache<T> for MemoryCache<T> {
    fn get(&self, key: &str) -> Option<T> {
        let mut expired = false;
        let found = match self.data.write() {
            Ok(mut data) => match data.get_mut(key) {
                Some(entry) if entry.is_expired() => {
                    expired = true;
                    None
                }
                Some(entry) => {
                    entry.mark_accessed();
                    Some(entry.value.clone())
                }
                None => None,
            },
            Err(_) => None,
        };

        if expired {
            if let Ok(mut data) = self.data.write() {
                data.remove(key);
            }
            debug!("Cache entry '{}' expired", key);
        }

        match found {
            Some(value) => {
                self.update_stats(|s| s.hits += 1);
                Some(value)
            }
            None => {
                self.update_stats(|s| s.misses += 1);
                None
            }
        }
    }

    fn put(&self, key: CacheKey, value: T, ttl: Option<Duration>) -> Result<()> {
        let ttl = ttl.or(self.config.default_ttl);
        let entry = CacheEntry::new(value, ttl);

        let mut data = self
            .data
            .write()
            .map_err(|_| Error::internal("Failed to acquire write lock for cache"))?;

        if !data.contains_key(&key) {
            while data.len() >= self.config.max_entries && !data.is_empty() {
                self.evict_lru(&mut data);
            }
        }

        data.insert(key, entry);
        let len = data.len() as u64;
        self.update_stats(|s| s.entries = len);
        Ok(())
    }

    fn remove(&self, key: &str) -> Option<T> {
        let mut data = self.data.write().ok()?;
        let removed = data.remove(key).map(|entry| entry.value);
        let len = data.len() as u64;
        self.update_stats(|s| s.entries = len);
        removed
    }

    fn clear(&self) {
        if let Ok(mut data) = self.data.write() {
            data.clear();
        }
        self.update_stats(|s| s.entries = 0);
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.entries = self.len() as u64;
        stats
    }

    fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    fn cleanup_expired(&self) -> usize {
        let Ok(mut data) = self.data.write() else {
            return 0;
        };
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired());
        let cleaned = before - data.len();
        let len = data.len() as u64;
        self.update_stats(|s| {
            s.expired_cleanups += cleaned as u64;
            s.entries = len;
        });
        if cleaned > 0 {
            debug!("Cleaned up {} expired cache entries", cleaned);
        }
        cleaned
    }
}

impl<T: Clone> Default for MemoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for MemoryCache<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}
