use crate::error::Result;
use crate::session::{
    generate_session_id, is_valid_session_id, Clock, RecordStorage, SessionCache, SessionData,
    SessionRecord, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a cached record
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Session store over a durable record storage with an optional read-through cache
///
/// Every kind of lookup failure (no identifier, malformed identifier, unknown
/// identifier, expired record) yields an empty [`SessionData`] without
/// identifier. Backend errors are returned to the caller.
#[derive(Clone)]
pub struct DatastoreSessionStore {
    storage: Arc<dyn RecordStorage>,
    cache: Option<Arc<dyn SessionCache>>,
    clock: Arc<dyn Clock>,
    max_age: Option<Duration>,
    cache_ttl: Duration,
}

impl DatastoreSessionStore {
    /// Store without cache and without age limit
    pub fn new(storage: Arc<dyn RecordStorage>) -> Self {
        Self {
            storage,
            cache: None,
            clock: Arc::new(SystemClock),
            max_age: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Backend names as `storage+cache`, for logging
    pub fn backend_name(&self) -> String {
        match &self.cache {
            Some(cache) => format!("{}+{}", self.storage.backend_name(), cache.backend_name()),
            None => self.storage.backend_name().to_string(),
        }
    }

    /// Load a working copy, or an empty one when nothing valid is stored
    pub async fn get(&self, session_id: Option<&str>) -> Result<SessionData> {
        let Some(session_id) = session_id else {
            return Ok(SessionData::new());
        };

        match self.get_by_sid(session_id).await? {
            Some(record) => Ok(SessionData::from_record(
                record.session_id,
                record.data,
                record.created,
            )),
            None => Ok(SessionData::new()),
        }
    }

    /// Persist the working copy, assigning an identifier on first save
    ///
    /// The record's data is replaced as a whole. Both the durable store and
    /// the cache are written.
    pub async fn save(&self, session: &mut SessionData) -> Result<()> {
        let now = self.clock.now();

        let (session_id, created) = match (session.session_id(), session.created()) {
            (Some(id), Some(created)) => (id.to_string(), created),
            (Some(id), None) => {
                let created = self
                    .storage
                    .get(id)
                    .await?
                    .map(|record| record.created)
                    .unwrap_or(now);
                (id.to_string(), created)
            }
            (None, _) => (generate_session_id(), now),
        };

        let record = SessionRecord::new(session_id.clone(), session.data().clone(), created);
        self.storage.put(&record).await?;
        self.set_cache(&record).await?;

        session.assign(session_id, created);
        session.mark_clean();

        log::debug!(
            "Saved session {} ({} keys) to {}",
            record.session_id,
            record.data.len(),
            self.backend_name()
        );
        Ok(())
    }

    /// Remove the record and its cache entry; the working copy is left as is
    pub async fn delete(&self, session: &SessionData) -> Result<()> {
        match session.session_id() {
            Some(session_id) => self.delete_by_sid(session_id).await,
            None => Ok(()),
        }
    }

    /// Load the working copy, then delete the stored session
    ///
    /// The record is deleted even when the age rule hides it from the lookup.
    pub async fn get_and_delete(&self, session_id: &str) -> Result<SessionData> {
        let session = self.get(Some(session_id)).await?;
        self.delete_by_sid(session_id).await?;
        Ok(session)
    }

    /// Look a record up by identifier
    ///
    /// Order: identifier shape check, cache, durable store, age rule, then
    /// cache fill. Records served from the cache skip the age rule.
    pub async fn get_by_sid(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        if !is_valid_session_id(session_id) {
            log::debug!("Rejected malformed session id ({} chars)", session_id.len());
            return Ok(None);
        }

        if let Some(record) = self.get_cache(session_id).await? {
            log::debug!("Session {} served from cache", session_id);
            return Ok(Some(record));
        }

        let Some(record) = self.storage.get(session_id).await? else {
            return Ok(None);
        };

        if let Some(max_age) = self.max_age {
            let now = self.clock.now();
            if record.is_expired(max_age, now) {
                log::debug!(
                    "Session {} expired (age {}s > {}s)",
                    session_id,
                    record.age(now),
                    max_age.as_secs()
                );
                return Ok(None);
            }
        }

        // Expired records never reach the cache, where the age rule is skipped
        self.set_cache(&record).await?;
        Ok(Some(record))
    }

    /// Read the cached copy of a record, if any
    ///
    /// Entries that fail to deserialize are dropped and reported as a miss.
    pub async fn get_cache(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };

        let Some(serialized) = cache.get(session_id).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<SessionRecord>(&serialized) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                log::warn!("Dropping unreadable cache entry for {}: {}", session_id, e);
                cache.delete(session_id).await?;
                Ok(None)
            }
        }
    }

    /// Invalidate the cached copy of a record
    pub async fn delete_cache(&self, session_id: &str) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.delete(session_id).await?;
        }
        Ok(())
    }

    /// Delete records older than the maximum age and their cache entries;
    /// no-op without a maximum age
    pub async fn purge_expired(&self) -> Result<usize> {
        let Some(max_age) = self.max_age else {
            return Ok(0);
        };

        let cutoff = self.clock.now().saturating_sub(max_age.as_secs());
        let removed = self.storage.cleanup_expired(cutoff).await?;
        for session_id in &removed {
            self.delete_cache(session_id).await?;
        }
        if !removed.is_empty() {
            log::info!("Purged {} expired sessions", removed.len());
        }
        Ok(removed.len())
    }

    /// Remove a record and its cache entry by identifier
    pub async fn delete_by_sid(&self, session_id: &str) -> Result<()> {
        if !is_valid_session_id(session_id) {
            return Ok(());
        }
        self.storage.delete(session_id).await?;
        self.delete_cache(session_id).await?;
        log::debug!("Deleted session {}", session_id);
        Ok(())
    }

    async fn set_cache(&self, record: &SessionRecord) -> Result<()> {
        if let Some(cache) = &self.cache {
            let serialized = serde_json::to_string(record)?;
            cache
                .set(&record.session_id, serialized, self.cache_ttl)
                .await?;
        }
        Ok(())
    }
}
