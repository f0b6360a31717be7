use crate::config::{CacheBackendConfig, SessionConfig, SessionStorageConfig};
use crate::error::Result;
use crate::session::{
    DatastoreSessionStore, MemoryRecordStorage, MemorySessionCache, RecordStorage, SessionCache,
    SqliteRecordStorage,
};
use std::sync::Arc;

/// Builds session stores from configuration
pub struct SessionStoreFactory;

impl SessionStoreFactory {
    /// Create a store with the configured storage, cache, max age and cache TTL
    pub async fn create_store(config: &SessionConfig) -> Result<DatastoreSessionStore> {
        let storage = Self::create_storage(&config.storage).await?;

        let mut store = DatastoreSessionStore::new(storage)
            .with_max_age(config.max_age())
            .with_cache_ttl(config.cache.ttl());

        if config.cache.enabled {
            store = store.with_cache(Self::create_cache(&config.cache.backend).await?);
        }

        log::info!(
            "Session store ready: {} (max_age: {:?})",
            store.backend_name(),
            config.max_age
        );
        Ok(store)
    }

    /// Create a durable storage backend from configuration
    pub async fn create_storage(config: &SessionStorageConfig) -> Result<Arc<dyn RecordStorage>> {
        match config {
            SessionStorageConfig::Memory => Ok(Self::create_memory_storage()),
            SessionStorageConfig::Sqlite { url, table } => {
                let storage = SqliteRecordStorage::connect(url, table).await?;
                Ok(Arc::new(storage))
            }
        }
    }

    /// Create a cache backend from configuration
    pub async fn create_cache(config: &CacheBackendConfig) -> Result<Arc<dyn SessionCache>> {
        match config {
            CacheBackendConfig::Memory { max_entries } => {
                Ok(Arc::new(MemorySessionCache::with_capacity(*max_entries)))
            }

            #[cfg(feature = "redis")]
            CacheBackendConfig::Redis {
                url,
                prefix,
                pool_size,
                command_timeout,
            } => {
                use crate::session::redis::RedisSessionCache;
                let cache = RedisSessionCache::from_url(
                    url,
                    prefix,
                    *pool_size,
                    std::time::Duration::from_millis(*command_timeout),
                )
                .await?;
                Ok(Arc::new(cache))
            }

            #[cfg(not(feature = "redis"))]
            CacheBackendConfig::Redis { .. } => Err(crate::error::Error::config(
                "Redis session cache requires the 'redis' feature",
            )),
        }
    }

    /// Create default memory storage
    pub fn create_memory_storage() -> Arc<dyn RecordStorage> {
        Arc::new(MemoryRecordStorage::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionCacheConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_default_store() {
        let store = SessionStoreFactory::create_store(&SessionConfig::default())
            .await
            .unwrap();
        assert_eq!(store.backend_name(), "memory+memory");
        assert_eq!(store.max_age(), None);
    }

    #[tokio::test]
    async fn test_create_sqlite_store_without_cache() {
        let config = SessionConfig {
            max_age: Some(3600),
            cache: SessionCacheConfig {
                enabled: false,
                ..Default::default()
            },
            storage: SessionStorageConfig::Sqlite {
                url: "sqlite::memory:".to_string(),
                table: "web_sessions".to_string(),
            },
            ..Default::default()
        };

        let store = SessionStoreFactory::create_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        assert!(!store.has_cache());
        assert_eq!(store.max_age(), Some(Duration::from_secs(3600)));
    }

    #[cfg(not(feature = "redis"))]
    #[tokio::test]
    async fn test_redis_cache_requires_feature() {
        let config = CacheBackendConfig::Redis {
            url: "redis://localhost:6379".to_string(),
            prefix: "test:session:".to_string(),
            pool_size: 5,
            command_timeout: 3000,
        };

        let err = SessionStoreFactory::create_cache(&config).await.err().unwrap();
        assert_eq!(err.error_code(), "E_CONFIG");
    }

    #[cfg(feature = "redis")]
    #[tokio::test]
    async fn test_create_redis_cache() {
        let config = CacheBackendConfig::Redis {
            url: "redis://localhost:6379".to_string(),
            prefix: "test:session:".to_string(),
            pool_size: 5,
            command_timeout: 3000,
        };

        // Only meaningful when Redis is running
        if let Ok(cache) = SessionStoreFactory::create_cache(&config).await {
            assert_eq!(cache.backend_name(), "redis");
        } else {
            println!("Redis not available, skipping Redis cache test");
        }
    }
}
