//! In-memory session storage.

use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::traits::{Session, SessionStore, generate_session_id};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Session store keeping every session in a process-local map.
///
/// Sessions do not survive a restart.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    config: SessionConfig,
}

impl MemorySessionStore {
    /// Create a new memory store.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::memory())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<Session> {
        let session = Session::new(
            generate_session_id(),
            ttl.unwrap_or(self.config.default_ttl),
        );
        self.save(&session).await?;

        debug!(session_id = %session.id, "Started memory session");
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> SessionResult<Option<Session>> {
        let session = self.sessions.read().await.get(session_id).cloned();

        match session {
            Some(session) if session.is_expired() => {
                trace!(session_id, "Memory session expired");
                self.delete(session_id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> SessionResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn count(&self) -> SessionResult<usize> {
        Ok(self.sessions.read().await.len())
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before - sessions.len())
    }

    async fn clear_all(&self) -> SessionResult<()> {
        self.sessions.write().await.clear();
        Ok(())
    }

    fn keep_alive(&self) -> bool {
        self.config.keep_alive
    }

    fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }
}
