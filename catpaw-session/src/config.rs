//! Session configuration.

use crate::error::{SessionError, SessionResult};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE_NAME: &str = "session-id";

/// Default session lifetime: one day.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);

/// Session backend type.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionBackend {
    /// In-process map, lost on restart
    Memory,
    /// One JSON file per session inside a directory
    FileSystem(PathBuf),
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend type
    pub backend: SessionBackend,
    /// Name of the cookie carrying the session id
    pub cookie_name: String,
    /// Default session TTL
    pub default_ttl: Duration,
    /// Refresh the expiration every time a session is validated
    pub keep_alive: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            default_ttl: DEFAULT_SESSION_TTL,
            keep_alive: false,
        }
    }
}

impl SessionConfig {
    /// Create an in-memory session configuration.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Create a filesystem session configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use catpaw_session::SessionConfig;
    ///
    /// let config = SessionConfig::filesystem(".sessions").unwrap();
    /// assert!(!config.keep_alive);
    /// ```
    pub fn filesystem(directory: impl Into<PathBuf>) -> SessionResult<Self> {
        let directory = directory.into();
        if directory.as_os_str().is_empty() {
            return Err(SessionError::Config(
                "Session directory must not be empty".to_string(),
            ));
        }

        Ok(Self {
            backend: SessionBackend::FileSystem(directory),
            ..Default::default()
        })
    }

    /// Set the default session TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Refresh sessions on every validation.
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Override the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.backend, SessionBackend::Memory);
        assert_eq!(config.cookie_name, "session-id");
        assert_eq!(config.default_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_filesystem_requires_directory() {
        assert!(SessionConfig::filesystem("").is_err());
        let config = SessionConfig::filesystem("/tmp/sessions")
            .unwrap()
            .with_keep_alive(true);
        assert!(config.keep_alive);
        assert_eq!(
            config.backend,
            SessionBackend::FileSystem(PathBuf::from("/tmp/sessions"))
        );
    }
}
