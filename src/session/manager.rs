use crate::config::CookieConfig;
use crate::error::{Error, Result};
use crate::session::{DatastoreSessionStore, SessionData};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Cookie directive produced at the end of a request
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<u64>,
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: String,
    /// True when the directive removes the cookie from the client
    pub expire: bool,
}

impl SessionCookie {
    fn from_config(name: &str, value: String, config: &CookieConfig) -> Self {
        Self {
            name: name.to_string(),
            value,
            max_age: config.max_age,
            domain: config.domain.clone(),
            path: config.path.clone(),
            secure: config.secure,
            http_only: config.http_only,
            same_site: config.same_site.clone(),
            expire: false,
        }
    }

    fn expired(name: &str, config: &CookieConfig) -> Self {
        Self {
            max_age: Some(0),
            expire: true,
            ..Self::from_config(name, String::new(), config)
        }
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        let mut cookie = format!("{}={}", self.name, self.value);

        cookie.push_str(&format!("; Path={}", self.path));

        if let Some(ref domain) = self.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if self.secure {
            cookie.push_str("; Secure");
        }

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }

        cookie.push_str(&format!("; SameSite={}", self.same_site));

        if let Some(max_age) = self.max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }

        if self.expire {
            cookie.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        }

        cookie
    }
}

/// Sessions of a single request
///
/// Working copies are loaded lazily from the identifiers carried by the
/// request cookies and written back by [`finish`](Self::finish).
pub struct SessionManager {
    store: Arc<DatastoreSessionStore>,
    cookie: CookieConfig,
    cookies: HashMap<String, String>,
    sessions: IndexMap<String, SessionData>,
    deleted: Vec<String>,
}

impl SessionManager {
    pub fn new(
        store: Arc<DatastoreSessionStore>,
        cookie: CookieConfig,
        cookies: HashMap<String, String>,
    ) -> Self {
        Self {
            store,
            cookie,
            cookies,
            sessions: IndexMap::new(),
            deleted: Vec::new(),
        }
    }

    /// Working copy for the cookie `key`, or the default session cookie
    pub async fn session(&mut self, key: Option<&str>) -> Result<&mut SessionData> {
        let key = key.unwrap_or(self.cookie.name.as_str()).to_string();

        if !self.sessions.contains_key(&key) {
            let session_id = self.cookies.get(&key).map(String::as_str);
            let session = self.store.get(session_id).await?;
            self.sessions.insert(key.clone(), session);
        }

        self.sessions
            .get_mut(&key)
            .ok_or_else(|| Error::internal(format!("Session '{}' vanished after load", key)))
    }

    pub async fn set_flash<T: Serialize>(&mut self, value: T) -> Result<()> {
        self.session(None).await?.set_flash(value)
    }

    pub async fn get_flash(&mut self) -> Result<Vec<Value>> {
        Ok(self.session(None).await?.get_flash())
    }

    /// Delete the session behind `key` and expire its cookie
    pub async fn delete(&mut self, key: Option<&str>) -> Result<()> {
        let key = key.unwrap_or(self.cookie.name.as_str()).to_string();

        match self.sessions.shift_remove(&key) {
            Some(session) => self.store.delete(&session).await?,
            None => {
                if let Some(session_id) = self.cookies.get(&key) {
                    self.store.delete_by_sid(session_id).await?;
                }
            }
        }

        self.cookies.remove(&key);
        if !self.deleted.contains(&key) {
            self.deleted.push(key);
        }
        Ok(())
    }

    /// Save modified sessions and return the cookies to send back
    pub async fn finish(&mut self) -> Result<Vec<SessionCookie>> {
        let mut directives = Vec::new();

        for (key, mut session) in self.sessions.drain(..) {
            if !session.is_modified() {
                continue;
            }

            self.store.save(&mut session).await?;
            let Some(session_id) = session.session_id() else {
                continue;
            };

            self.deleted.retain(|deleted| deleted != &key);
            directives.push(SessionCookie::from_config(
                &key,
                session_id.to_string(),
                &self.cookie,
            ));
        }

        for key in self.deleted.drain(..) {
            directives.push(SessionCookie::expired(&key, &self.cookie));
        }

        log::debug!("Session manager emitted {} cookies", directives.len());
        Ok(directives)
    }
}
