use crate::error::{Error, Result};
use crate::session::{RecordStorage, SessionRecord};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Durable session storage in a SQLite document table
///
/// Each record is one row: `sid TEXT PRIMARY KEY, data TEXT, created INTEGER`,
/// where `data` holds the session mapping as a JSON document. Writes to an
/// existing row only replace `data`.
#[derive(Clone)]
pub struct SqliteRecordStorage {
    pool: SqlitePool,
    table: String,
}

impl SqliteRecordStorage {
    /// Connect to `url` and create the table if needed
    ///
    /// In-memory databases are pinned to a single long-lived connection so
    /// every query sees the same data.
    pub async fn connect(url: &str, table: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        let storage = Self::from_pool(pool, table)?;
        storage.migrate().await?;
        log::info!("SQLite session storage ready (table '{}')", storage.table);
        Ok(storage)
    }

    /// Wrap an existing pool; call [`migrate`](Self::migrate) before use
    pub fn from_pool(pool: SqlitePool, table: &str) -> Result<Self> {
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::config(format!(
                "Invalid session table name '{}': use letters, digits and underscores",
                table
            )));
        }

        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub async fn migrate(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                sid TEXT PRIMARY KEY NOT NULL,
                data TEXT NOT NULL,
                created INTEGER NOT NULL
            )",
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl RecordStorage for SqliteRecordStorage {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let sql = format!("SELECT data, created FROM {} WHERE sid = ?", self.table);
        let row: Option<(String, i64)> = sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((data, created)) => {
                let data: Map<String, Value> = serde_json::from_str(&data).map_err(|e| {
                    Error::storage(format!(
                        "Session {} holds a corrupted document: {}",
                        session_id, e
                    ))
                })?;
                Ok(Some(SessionRecord::new(
                    session_id,
                    data,
                    created.max(0) as u64,
                )))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: &SessionRecord) -> Result<()> {
        let document = serde_json::to_string(&record.data)?;
        let sql = format!(
            "INSERT INTO {} (sid, data, created) VALUES (?, ?, ?)
             ON CONFLICT(sid) DO UPDATE SET data = excluded.data",
            self.table
        );
        sqlx::query(&sql)
            .bind(&record.session_id)
            .bind(document)
            .bind(record.created as i64)
            .execute(&self.pool)
            .await?;
        log::debug!("SqliteStorage: stored session {}", record.session_id);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE sid = ?", self.table);
        sqlx::query(&sql)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cleanup_expired(&self, created_before: u64) -> Result<Vec<String>> {
        let sql = format!(
            "DELETE FROM {} WHERE created < ? RETURNING sid",
            self.table
        );
        let removed = sqlx::query_scalar::<_, String>(&sql)
            .bind(created_before as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
