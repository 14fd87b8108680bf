//! Session store trait definition.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Session data structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    /// Session data as key-value pairs
    pub data: HashMap<String, serde_json::Value>,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last access timestamp
    pub last_accessed_at: DateTime<Utc>,
    /// Session expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with the given ID and TTL.
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            data: HashMap::new(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Get a value from the session data.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the session data.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a value from the session data.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Check if a key exists in the session data.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Clear all session data.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Update the last accessed timestamp.
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    /// Push the expiration `ttl` into the future.
    pub fn extend(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
    }
}

/// Session storage backend.
///
/// Sessions are validated lazily: a store is only consulted when a handler
/// asks for the session of the current request.
///
/// # Examples
///
/// ```
/// use catpaw_session::{MemorySessionStore, SessionStore};
///
/// # async fn example() -> catpaw_session::SessionResult<()> {
/// let store = MemorySessionStore::default();
///
/// let mut session = store.validate(None).await?;
/// session.set("user_id", 123)?;
/// store.save(&session).await?;
///
/// let again = store.validate(Some(&session.id)).await?;
/// assert_eq!(again.get::<i32>("user_id"), Some(123));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session.
    ///
    /// Uses the store's default TTL when `ttl` is `None`.
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<Session>;

    /// Get a session by ID.
    ///
    /// Returns `Ok(None)` if not found or expired.
    async fn get(&self, session_id: &str) -> SessionResult<Option<Session>>;

    /// Save/update a session.
    async fn save(&self, session: &Session) -> SessionResult<()>;

    /// Delete a session.
    async fn delete(&self, session_id: &str) -> SessionResult<()>;

    /// Check if a session exists and is valid.
    async fn exists(&self, session_id: &str) -> SessionResult<bool> {
        Ok(self.get(session_id).await?.is_some())
    }

    /// Get the number of stored sessions.
    async fn count(&self) -> SessionResult<usize>;

    /// Remove expired sessions, returning how many were dropped.
    async fn cleanup_expired(&self) -> SessionResult<usize>;

    /// Clear all sessions.
    async fn clear_all(&self) -> SessionResult<()>;

    /// Whether validation refreshes the expiration of a live session.
    fn keep_alive(&self) -> bool {
        false
    }

    /// Default TTL applied to new and refreshed sessions.
    fn default_ttl(&self) -> Duration;

    /// Resolve the session for an incoming request.
    ///
    /// A live session is returned as is (refreshed when keep-alive is on).
    /// Unknown, expired or missing ids produce a brand new session.
    async fn validate(&self, session_id: Option<&str>) -> SessionResult<Session> {
        if let Some(id) = session_id.filter(|id| !id.is_empty())
            && let Some(mut session) = self.get(id).await?
        {
            session.touch();
            if self.keep_alive() {
                session.extend(self.default_ttl());
                self.save(&session).await?;
            }
            return Ok(session);
        }

        self.create(None).await
    }
}

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Session ids end up in file names, so only a conservative alphabet is accepted.
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_data() {
        let mut session = Session::new("abc", Duration::from_secs(60));
        session.set("name", "world").unwrap();
        assert_eq!(session.get::<String>("name").as_deref(), Some("world"));
        assert!(session.contains("name"));
        assert!(session.remove("name").is_some());
        assert!(!session.contains("name"));
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let session = Session::new("abc", Duration::ZERO);
        assert!(session.is_expired());
    }

    #[test]
    fn test_session_id_alphabet() {
        assert!(is_valid_session_id(&generate_session_id()));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("../etc/passwd"));
        assert!(!is_valid_session_id("a/b"));
    }
}
