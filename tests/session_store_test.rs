#[cfg(test)]
mod tests {
    use datastore_ext::session::{
        DatastoreSessionStore, ManualClock, MemoryRecordStorage, MemorySessionCache,
        RecordStorage, SessionData, SqliteRecordStorage,
    };
    use serde_json::Map;
    use std::sync::Arc;
    use std::time::Duration;

    fn memory_store() -> DatastoreSessionStore {
        DatastoreSessionStore::new(Arc::new(MemoryRecordStorage::new()))
            .with_cache(Arc::new(MemorySessionCache::new()))
    }

    async fn saved_session(store: &DatastoreSessionStore) -> SessionData {
        let mut session = store.get(None).await.unwrap();
        session.set("foo", "bar").unwrap();
        session.set("baz", "ding").unwrap();
        store.save(&mut session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_get_without_sid() {
        let session = memory_store().get(None).await.unwrap();
        assert!(session.session_id().is_none());
        assert_eq!(session, Map::new());
    }

    #[tokio::test]
    async fn test_get_with_invalid_sid() {
        let session = memory_store().get(Some("a")).await.unwrap();
        assert!(session.session_id().is_none());
        assert_eq!(session, Map::new());
    }

    #[tokio::test]
    async fn test_get_with_non_existent_sid() {
        let session = memory_store().get(Some("a".repeat(40).as_str())).await.unwrap();
        assert!(session.session_id().is_none());
        assert_eq!(session, Map::new());
    }

    #[tokio::test]
    async fn test_save() {
        let store = memory_store();
        let session = saved_session(&store).await;

        let loaded = store.get(session.session_id()).await.unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.get::<String>("foo"), Some("bar".to_string()));
        assert_eq!(loaded.get::<String>("baz"), Some("ding".to_string()));
        assert!(!loaded.is_modified());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = memory_store();
        let session = saved_session(&store).await;

        store.delete(&session).await.unwrap();

        let loaded = store.get(session.session_id()).await.unwrap();
        assert!(!loaded.contains("foo"));
        assert_eq!(loaded, Map::new());
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let store = memory_store();
        let session = saved_session(&store).await;
        let session_id = session.session_id().unwrap().to_string();

        let taken = store.get_and_delete(&session_id).await.unwrap();
        assert_eq!(taken, session);

        let loaded = store.get(Some(session_id.as_str())).await.unwrap();
        assert_eq!(loaded, Map::new());
    }

    #[tokio::test]
    async fn test_get_by_sid_without_cache() {
        let store = memory_store();
        let session = saved_session(&store).await;
        let session_id = session.session_id().unwrap();

        assert!(store.get_cache(session_id).await.unwrap().is_some());
        store.delete_cache(session_id).await.unwrap();
        assert!(store.get_cache(session_id).await.unwrap().is_none());

        let record = store.get_by_sid(session_id).await.unwrap().unwrap();
        assert_eq!(record.data.get("foo"), Some(&serde_json::json!("bar")));
        assert_eq!(record.data.get("baz"), Some(&serde_json::json!("ding")));

        // The lookup refilled the cache
        assert!(store.get_cache(session_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_by_sid_expired() {
        let clock = ManualClock::starting_now();
        let storage = MemoryRecordStorage::new();
        let store = DatastoreSessionStore::new(Arc::new(storage.clone()))
            .with_cache(Arc::new(MemorySessionCache::new()))
            .with_clock(Arc::new(clock.clone()))
            .with_max_age(Some(Duration::from_secs(600)));

        let session = saved_session(&store).await;
        let session_id = session.session_id().unwrap();
        store.delete_cache(session_id).await.unwrap();
        assert!(store.get_by_sid(session_id).await.unwrap().is_some());

        store.delete_cache(session_id).await.unwrap();
        clock.advance(Duration::from_secs(86_400));

        assert!(store.get_by_sid(session_id).await.unwrap().is_none());
        assert_eq!(store.get(Some(session_id)).await.unwrap(), Map::new());
        // Still stored, only treated as absent
        assert!(storage.get(session_id).await.unwrap().is_some());
        assert!(store.get_cache(session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purged_session_is_not_served_from_cache() {
        let clock = ManualClock::starting_now();
        let storage = MemoryRecordStorage::new();
        let store = DatastoreSessionStore::new(Arc::new(storage.clone()))
            .with_cache(Arc::new(MemorySessionCache::new()))
            .with_clock(Arc::new(clock.clone()))
            .with_max_age(Some(Duration::from_secs(600)));

        let mut session = store.get(None).await.unwrap();
        session.set("user", "alice").unwrap();
        store.save(&mut session).await.unwrap();
        let session_id = session.session_id().unwrap().to_string();

        clock.advance(Duration::from_secs(601));
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(storage.len(), 0);

        let mut loaded = store.get(Some(session_id.as_str())).await.unwrap();
        assert_eq!(loaded, Map::new());
        assert!(loaded.session_id().is_none());

        // Saving the empty copy starts a new session instead of reviving the old one
        loaded.set("user", "bob").unwrap();
        store.save(&mut loaded).await.unwrap();
        assert_ne!(loaded.session_id(), Some(session_id.as_str()));
        assert!(storage.get(&session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flash_is_consumed() {
        let store = memory_store();
        let mut session = store.get(None).await.unwrap();
        session.set_flash(serde_json::json!("saved")).unwrap();
        store.save(&mut session).await.unwrap();

        let mut loaded = store.get(session.session_id()).await.unwrap();
        assert_eq!(loaded.get_flash(), vec![serde_json::json!("saved")]);
        store.save(&mut loaded).await.unwrap();

        let mut again = store.get(session.session_id()).await.unwrap();
        assert!(again.get_flash().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_backend_round_trip() {
        let storage = SqliteRecordStorage::connect("sqlite::memory:", "sessions")
            .await
            .unwrap();
        let store = DatastoreSessionStore::new(Arc::new(storage))
            .with_cache(Arc::new(MemorySessionCache::new()));
        assert_eq!(store.backend_name(), "sqlite+memory");

        let session = saved_session(&store).await;
        let session_id = session.session_id().unwrap().to_string();

        store.delete_cache(&session_id).await.unwrap();
        let loaded = store.get(Some(session_id.as_str())).await.unwrap();
        assert_eq!(loaded, session);

        let taken = store.get_and_delete(&session_id).await.unwrap();
        assert_eq!(taken, session);
        assert_eq!(store.get(Some(session_id.as_str())).await.unwrap(), Map::new());
    }

    #[tokio::test]
    async fn test_sqlite_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("sessions.db").display());

        let session_id = {
            let storage = SqliteRecordStorage::connect(&url, "sessions").await.unwrap();
            let store = DatastoreSessionStore::new(Arc::new(storage));
            let session = saved_session(&store).await;
            session.session_id().unwrap().to_string()
        };

        let storage = SqliteRecordStorage::connect(&url, "sessions").await.unwrap();
        let store = DatastoreSessionStore::new(Arc::new(storage));
        let loaded = store.get(Some(session_id.as_str())).await.unwrap();
        assert_eq!(loaded.get::<String>("foo"), Some("bar".to_string()));
    }
}
