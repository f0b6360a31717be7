//! Datastore-backed sessions
//!
//! A session is a JSON object persisted as a [`SessionRecord`] in a durable
//! [`RecordStorage`], optionally fronted by a [`SessionCache`]. Request code
//! works on a [`SessionData`] working copy obtained from
//! [`store::DatastoreSessionStore`].

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod cache;
pub mod data;
pub mod factory;
pub mod manager;
pub mod sqlite;
pub mod storage;
pub mod store;

#[cfg(feature = "redis")]
pub mod redis;

pub use cache::MemorySessionCache;
pub use data::SessionData;
pub use factory::SessionStoreFactory;
pub use manager::{SessionCookie, SessionManager};
pub use sqlite::SqliteRecordStorage;
pub use storage::MemoryRecordStorage;
pub use store::DatastoreSessionStore;

/// Length of every generated session identifier
pub const SESSION_ID_LENGTH: usize = 40;

/// Persisted form of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub data: Map<String, Value>,
    /// Creation time (Unix seconds), never changed after the first save
    pub created: u64,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, data: Map<String, Value>, created: u64) -> Self {
        Self {
            session_id: session_id.into(),
            data,
            created,
        }
    }

    /// Age in seconds relative to `now`
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.created)
    }

    /// True when the record is older than `max_age`
    pub fn is_expired(&self, max_age: Duration, now: u64) -> bool {
        self.age(now) > max_age.as_secs()
    }
}

/// Source of the current time (Unix seconds)
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        unix_timestamp()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    /// Start at the current wall-clock time
    pub fn starting_now() -> Self {
        Self::new(unix_timestamp())
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Get current Unix timestamp in seconds
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Generate a new session identifier: 40 lowercase hex characters
pub fn generate_session_id() -> String {
    use rand::{thread_rng, RngCore};

    let mut seed = [0u8; 32];
    thread_rng().fill_bytes(&mut seed);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(nanos.to_le_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Check identifier shape before any lookup
pub fn is_valid_session_id(session_id: &str) -> bool {
    session_id.len() == SESSION_ID_LENGTH
        && session_id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Durable session record store
///
/// Implementations are keyed by session identifier and must not change the
/// `created` field of an existing record on `put`.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Insert or overwrite a record
    async fn put(&self, record: &SessionRecord) -> Result<()>;

    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Delete records created before `created_before` (Unix seconds),
    /// returning the identifiers that were removed
    async fn cleanup_expired(&self, created_before: u64) -> Result<Vec<String>>;

    fn backend_name(&self) -> &'static str;
}

/// Cache placed in front of a [`RecordStorage`]
///
/// Values are serialized [`SessionRecord`]s. Expiration is owned by the cache.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<String>>;

    async fn set(&self, session_id: &str, value: String, ttl: Duration) -> Result<()>;

    async fn delete(&self, session_id: &str) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}
