use crate::error::{Error, Result};
use crate::session::SessionCache;
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

/// Redis-backed session cache with connection pooling
///
/// Entries are stored with `SETEX`, so Redis expires them on its own
/// schedule independent of the session age rule.
#[derive(Clone)]
pub struct RedisSessionCache {
    pool: Pool,
    prefix: String,
    command_timeout: Duration,
}

impl RedisSessionCache {
    /// Connect with a pool of `pool_size` connections and verify with PING
    pub async fn from_url(
        redis_url: &str,
        prefix: &str,
        pool_size: usize,
        command_timeout: Duration,
    ) -> Result<Self> {
        let mut cfg = Config::from_url(redis_url);
        cfg.pool = Some(PoolConfig {
            max_size: pool_size,
            ..Default::default()
        });

        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

        let mut conn = pool.get().await?;
        tokio::time::timeout(
            command_timeout,
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| Error::cache("Redis connection test timed out"))??;

        log::info!("Redis session cache connected ({})", prefix);
        Ok(Self {
            pool,
            prefix: prefix.to_string(),
            command_timeout,
        })
    }

    fn cache_key(&self, session_id: &str) -> String {
        format!("{}{}", self.prefix, session_id)
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, session_id: &str) -> Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        let key = self.cache_key(session_id);

        let value = tokio::time::timeout(
            self.command_timeout,
            conn.get::<&str, Option<String>>(&key),
        )
        .await
        .map_err(|_| Error::cache("Redis GET operation timed out"))??;

        Ok(value)
    }

    async fn set(&self, session_id: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let key = self.cache_key(session_id);

        tokio::time::timeout(
            self.command_timeout,
            conn.set_ex::<&str, String, ()>(&key, value, ttl.as_secs().max(1)),
        )
        .await
        .map_err(|_| Error::cache("Redis SETEX operation timed out"))??;

        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let key = self.cache_key(session_id);

        tokio::time::timeout(self.command_timeout, conn.del::<&str, i32>(&key))
            .await
            .map_err(|_| Error::cache("Redis DEL operation timed out"))??;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
