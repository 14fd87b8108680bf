//! Request-scoped access to a [`Session`].
//!
//! The session is validated against the store the first time a handler
//! touches it; requests that never use it never reach the store.

use crate::cookie::Cookie;
use crate::error::Result;
use catpaw_session::{SESSION_COOKIE_NAME, Session, SessionStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tokio::sync::{Mutex, OnceCell};

pub struct SessionHandle {
    store: Arc<dyn SessionStore>,
    requested_id: Option<String>,
    session: OnceCell<Mutex<Session>>,
    destroyed: AtomicBool,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("requested_id", &self.requested_id)
            .field("loaded", &self.session.initialized())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl SessionHandle {
    /// `requested_id` is the `session-id` cookie of the request, if any.
    pub fn new(store: Arc<dyn SessionStore>, requested_id: Option<String>) -> Self {
        Self {
            store,
            requested_id,
            session: OnceCell::new(),
            destroyed: AtomicBool::new(false),
        }
    }

    async fn load(&self) -> Result<&Mutex<Session>> {
        let cell = self
            .session
            .get_or_try_init(|| async {
                let session = self.store.validate(self.requested_id.as_deref()).await?;
                tracing::trace!(session_id = %session.id, "Session validated");
                Ok::<_, crate::Error>(Mutex::new(session))
            })
            .await?;
        Ok(cell)
    }

    /// The live session id, creating the session if needed.
    pub async fn id(&self) -> Result<String> {
        Ok(self.load().await?.lock().await.id.clone())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let session = self.load().await?.lock().await;
        Ok(session.get(key))
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let session = self.load().await?.lock().await;
        Ok(session.data.get(key).cloned())
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let mut session = self.load().await?.lock().await;
        session.set(key, value)?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<Option<Value>> {
        let mut session = self.load().await?.lock().await;
        Ok(session.remove(key))
    }

    pub async fn contains(&self, key: &str) -> Result<bool> {
        let session = self.load().await?.lock().await;
        Ok(session.contains(key))
    }

    pub async fn clear(&self) -> Result<()> {
        self.load().await?.lock().await.clear();
        Ok(())
    }

    /// Copy of the session data.
    pub async fn snapshot(&self) -> Result<Session> {
        Ok(self.load().await?.lock().await.clone())
    }

    /// End the session. It is deleted from the store on commit and the
    /// client is told to drop its cookie.
    pub async fn destroy(&self) -> Result<()> {
        self.load().await?;
        self.destroyed.store(true, Ordering::Release);
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Whether the session was used during this request.
    pub fn is_loaded(&self) -> bool {
        self.session.initialized()
    }

    /// Persist a used session and return the cookie to send back.
    ///
    /// `None` when the session was never touched.
    pub async fn commit(&self) -> Result<Option<Cookie>> {
        let Some(session) = self.session.get() else {
            return Ok(None);
        };
        let session = session.lock().await;

        if self.is_destroyed() {
            self.store.delete(&session.id).await?;
            tracing::debug!(session_id = %session.id, "Session destroyed");
            return Ok(Some(
                Cookie::new(SESSION_COOKIE_NAME, "")
                    .with_expires(SystemTime::UNIX_EPOCH)
                    .with_path("/")
                    .http_only(),
            ));
        }

        self.store.save(&session).await?;
        tracing::debug!(session_id = %session.id, "Session saved");

        let expires = SystemTime::from(session.expires_at);
        Ok(Some(
            Cookie::new(SESSION_COOKIE_NAME, session.id.clone())
                .with_expires(expires)
                .with_path("/")
                .http_only(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catpaw_session::MemorySessionStore;

    #[tokio::test]
    async fn test_untouched_session_is_not_committed() {
        let store = Arc::new(MemorySessionStore::default());
        let handle = SessionHandle::new(store.clone(), None);
        assert!(handle.commit().await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_session_reused_by_id() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());

        let first = SessionHandle::new(store.clone(), None);
        first.set("user", "cat").await.unwrap();
        let cookie = first.commit().await.unwrap().unwrap();
        assert_eq!(cookie.key, SESSION_COOKIE_NAME);

        let second = SessionHandle::new(store, Some(cookie.value.clone()));
        assert_eq!(second.id().await.unwrap(), cookie.value);
        assert_eq!(
            second.get::<String>("user").await.unwrap().as_deref(),
            Some("cat")
        );
    }

    #[tokio::test]
    async fn test_destroyed_session_is_deleted() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());

        let handle = SessionHandle::new(store.clone(), None);
        handle.set("user", "cat").await.unwrap();
        let id = handle.commit().await.unwrap().unwrap().value;
        assert_eq!(store.count().await.unwrap(), 1);

        let handle = SessionHandle::new(store.clone(), Some(id));
        handle.destroy().await.unwrap();
        let cookie = handle.commit().await.unwrap().unwrap();
        assert!(cookie.value.is_empty());
        assert_eq!(cookie.expires, Some(SystemTime::UNIX_EPOCH));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
