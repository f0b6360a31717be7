/// In-process caching
///
/// A small TTL cache used as the default read-through layer in front of the
/// session record store:
/// - entries expire after their own TTL
/// - least recently used entries are evicted at capacity
/// - hit/miss statistics for monitoring
pub mod memory;

pub use memory::MemoryCache;

use crate::error::Result;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cache key type
pub type CacheKey = String;

/// Cached value with its expiration data
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: u64,
    pub expires_at: Option<u64>,
    pub last_access: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Option<Duration>) -> Self {
        let now = current_timestamp();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|d| now + d.as_millis() as u64),
            last_access: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => current_timestamp() >= expires_at,
            None => false,
        }
    }

    pub fn mark_accessed(&mut self) {
        self.last_access = current_timestamp();
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction
    pub max_entries: usize,
    /// TTL applied when `put` is given none (None = never expires)
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: Some(Duration::from_secs(600)),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub evictions: u64,
    pub expired_cleanups: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Synchronous key-value cache with per-entry TTL
pub trait Cache<T: Clone> {
    fn get(&self, key: &str) -> Option<T>;

    fn put(&self, key: CacheKey, value: T, ttl: Option<Duration>) -> Result<()>;

    fn remove(&self, key: &str) -> Option<T>;

    fn clear(&self);

    fn stats(&self) -> CacheStats;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries, returning how many were removed
    fn cleanup_expired(&self) -> usize;
}

/// Milliseconds since the Unix epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_entry_expiration() {
        let entry = CacheEntry::new("fresh".to_string(), Some(Duration::from_secs(60)));
        assert!(!entry.is_expired());

        let mut stale = CacheEntry::new("stale".to_string(), Some(Duration::from_secs(60)));
        stale.expires_at = Some(current_timestamp() - 1);
        assert!(stale.is_expired());

        let forever = CacheEntry::new("forever".to_string(), None);
        assert!(!forever.is_expired());
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
