//! Filesystem session storage.
//!
//! Each session lives in `<directory>/<session id>` as a small JSON document:
//!
//! ```json
//! {"STORAGE": {"user_id": 123}, "TIME": 1718000000}
//! ```
//!
//! `TIME` is the unix timestamp of the last refresh; a session is alive while
//! `now < TIME + ttl`. Loaded sessions are also kept in a process-local cache.

use crate::config::{SessionBackend, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::traits::{Session, SessionStore, generate_session_id, is_valid_session_id};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    #[serde(rename = "STORAGE", default)]
    storage: HashMap<String, serde_json::Value>,
    #[serde(rename = "TIME")]
    time: i64,
}

/// Session store persisting sessions as JSON files.
pub struct FileSystemSessionStore {
    directory: PathBuf,
    ttl: Duration,
    keep_alive: bool,
    cache: RwLock<HashMap<String, Session>>,
}

impl FileSystemSessionStore {
    /// Create a store writing into `directory`.
    ///
    /// The directory is created lazily on the first save.
    pub fn new(directory: impl AsRef<Path>, ttl: Duration, keep_alive: bool) -> Self {
        let directory = directory.as_ref();
        // "sessions/" and "sessions" are the same directory
        let trimmed = directory
            .to_str()
            .map(|s| s.trim_end_matches(['/', '\\']))
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| directory.to_path_buf());

        Self {
            directory: trimmed,
            ttl,
            keep_alive,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build a store from a [`SessionConfig`] using the filesystem backend.
    pub fn from_config(config: &SessionConfig) -> SessionResult<Self> {
        match &config.backend {
            SessionBackend::FileSystem(directory) => Ok(Self::new(
                directory,
                config.default_ttl,
                config.keep_alive,
            )),
            other => Err(SessionError::Config(format!(
                "Expected a filesystem session backend, found {:?}",
                other
            ))),
        }
    }

    /// Directory holding the session files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_name(&self, session_id: &str) -> PathBuf {
        self.directory.join(session_id)
    }

    fn expiration(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        time + chrono::Duration::from_std(self.ttl).unwrap_or_default()
    }

    async fn read_file(&self, session_id: &str) -> SessionResult<Option<Session>> {
        let file_name = self.file_name(session_id);
        let contents = match tokio::fs::read(&file_name).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // A corrupted file restarts the session with empty storage.
        let file = match serde_json::from_slice::<SessionFile>(&contents) {
            Ok(file) => file,
            Err(e) => {
                warn!(session_id, error = %e, "Discarding unreadable session file");
                SessionFile {
                    storage: HashMap::new(),
                    time: Utc::now().timestamp(),
                }
            }
        };

        let time = DateTime::from_timestamp(file.time, 0).unwrap_or_else(Utc::now);
        Ok(Some(Session {
            id: session_id.to_string(),
            data: file.storage,
            created_at: time,
            last_accessed_at: time,
            expires_at: self.expiration(time),
        }))
    }
}

#[async_trait]
impl SessionStore for FileSystemSessionStore {
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<Session> {
        let session = Session::new(generate_session_id(), ttl.unwrap_or(self.ttl));
        self.save(&session).await?;

        debug!(session_id = %session.id, directory = %self.directory.display(), "Started filesystem session");
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> SessionResult<Option<Session>> {
        if !is_valid_session_id(session_id) {
            trace!(session_id, "Rejecting malformed session id");
            return Ok(None);
        }

        let cached = self.cache.read().await.get(session_id).cloned();
        let session = match cached {
            Some(session) => Some(session),
            None => self.read_file(session_id).await?,
        };

        match session {
            Some(session) if session.is_expired() => {
                trace!(session_id, "Filesystem session expired");
                self.delete(session_id).await?;
                Ok(None)
            }
            Some(session) => {
                self.cache
                    .write()
                    .await
                    .insert(session.id.clone(), session.clone());
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        if !is_valid_session_id(&session.id) {
            return Err(SessionError::InvalidSessionId(session.id.clone()));
        }

        tokio::fs::create_dir_all(&self.directory).await?;

        // TIME is the moment the current lifetime started.
        let started = session.expires_at - chrono::Duration::from_std(self.ttl).unwrap_or_default();
        let file = SessionFile {
            storage: session.data.clone(),
            time: started.timestamp(),
        };
        let contents = serde_json::to_vec(&file)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        tokio::fs::write(self.file_name(&session.id), contents).await?;

        self.cache
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> SessionResult<()> {
        self.cache.write().await.remove(session_id);
        if !is_valid_session_id(session_id) {
            return Ok(());
        }

        match tokio::fs::remove_file(self.file_name(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, session_id: &str) -> SessionResult<bool> {
        if self.cache.read().await.contains_key(session_id) {
            return Ok(true);
        }
        Ok(is_valid_session_id(session_id)
            && tokio::fs::try_exists(self.file_name(session_id)).await?)
    }

    async fn count(&self) -> SessionResult<usize> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut expired = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_valid_session_id(&id) {
                continue;
            }
            if let Some(session) = self.read_file(&id).await?
                && session.is_expired()
            {
                expired.push(id);
            }
        }

        for id in &expired {
            self.delete(id).await?;
        }

        debug!(removed = expired.len(), "Cleaned up expired filesystem sessions");
        Ok(expired.len())
    }

    async fn clear_all(&self) -> SessionResult<()> {
        self.cache.write().await.clear();
        match tokio::fs::remove_dir_all(&self.directory).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    fn default_ttl(&self) -> Duration {
        self.ttl
    }
}
