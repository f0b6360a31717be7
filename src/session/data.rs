use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Reserved key holding queued flash messages
pub const FLASH_KEY: &str = "_flash";

/// Request-local working copy of a session
///
/// Mirrors the stored `data` mapping. The identifier stays `None` until the
/// copy is saved for the first time.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    session_id: Option<String>,
    data: Map<String, Value>,
    created: Option<u64>,
    modified: bool,
}

impl SessionData {
    /// Empty working copy without identifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Working copy loaded from a stored record
    pub fn from_record(session_id: String, data: Map<String, Value>, created: u64) -> Self {
        Self {
            session_id: Some(session_id),
            data,
            created: Some(created),
            modified: false,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Creation time of the backing record, if it was loaded from one
    pub fn created(&self) -> Option<u64> {
        self.created
    }

    pub(crate) fn assign(&mut self, session_id: String, created: u64) {
        self.session_id = Some(session_id);
        self.created = Some(created);
    }

    /// Get a value deserialized into `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.to_string(), value);
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remove every key, keeping the identifier
    pub fn clear(&mut self) {
        if !self.data.is_empty() {
            self.data.clear();
            self.modified = true;
        }
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_data(self) -> Map<String, Value> {
        self.data
    }

    /// True when the copy changed since it was loaded or last saved
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn mark_clean(&mut self) {
        self.modified = false;
    }

    /// Queue a one-time message for the next read
    pub fn set_flash<T: Serialize>(&mut self, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        match self.data.get_mut(FLASH_KEY) {
            Some(Value::Array(queue)) => queue.push(value),
            _ => {
                self.data
                    .insert(FLASH_KEY.to_string(), Value::Array(vec![value]));
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Take every queued flash message; a second call returns nothing
    pub fn get_flash(&mut self) -> Vec<Value> {
        match self.data.remove(FLASH_KEY) {
            Some(Value::Array(queue)) => {
                self.modified = true;
                queue
            }
            Some(other) => {
                self.modified = true;
                vec![other]
            }
            None => Vec::new(),
        }
    }
}

/// Compares session contents only, like comparing two mappings
impl PartialEq for SessionData {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl PartialEq<Map<String, Value>> for SessionData {
    fn eq(&self, other: &Map<String, Value>) -> bool {
        &self.data == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_operations() {
        let mut session = SessionData::new();
        assert!(session.session_id().is_none());
        assert!(!session.is_modified());

        session.set("foo", "bar").unwrap();
        session.set("count", 42).unwrap();

        assert!(session.contains("foo"));
        assert_eq!(session.get::<String>("foo"), Some("bar".to_string()));
        assert_eq!(session.get::<i64>("count"), Some(42));
        assert_eq!(session.get::<i64>("foo"), None);
        assert_eq!(session.len(), 2);
        assert!(session.is_modified());

        assert_eq!(session.remove("foo"), Some(json!("bar")));
        assert!(!session.contains("foo"));
    }

    #[test]
    fn test_loaded_copy_starts_clean() {
        let mut data = Map::new();
        data.insert("a".to_string(), json!(1));
        let mut session = SessionData::from_record("s".repeat(40), data, 10);

        assert_eq!(session.session_id(), Some("s".repeat(40).as_str()));
        assert_eq!(session.created(), Some(10));
        assert!(!session.is_modified());

        assert!(session.remove("missing").is_none());
        assert!(!session.is_modified());

        session.clear();
        assert!(session.is_empty());
        assert!(session.is_modified());
    }

    #[test]
    fn test_flash_is_consumed_once() {
        let mut session = SessionData::new();
        session.set_flash(json!(["foo", "bar"])).unwrap();
        session.set_flash("second").unwrap();

        let flashes = session.get_flash();
        assert_eq!(flashes, vec![json!(["foo", "bar"]), json!("second")]);
        assert!(session.get_flash().is_empty());
        assert!(!session.contains(FLASH_KEY));
    }

    #[test]
    fn test_equality_ignores_identifier() {
        let empty = SessionData::new();
        let loaded = SessionData::from_record("x".repeat(40), Map::new(), 0);
        assert_eq!(empty, loaded);
        assert_eq!(empty, Map::new());
    }
}
