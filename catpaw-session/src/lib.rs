//! Session management for CatPaw.
//!
//! Sessions are identified by the `session-id` cookie and validated lazily,
//! the first time a handler asks for them. Two stores are provided:
//!
//! - [`MemorySessionStore`]: process-local map
//! - [`FileSystemSessionStore`]: one JSON file per session
//!
//! # Examples
//!
//! ```
//! use catpaw_session::{FileSystemSessionStore, SessionStore};
//! use std::time::Duration;
//!
//! # async fn example() -> catpaw_session::SessionResult<()> {
//! let store = FileSystemSessionStore::new(".sessions", Duration::from_secs(3600), true);
//! let mut session = store.validate(None).await?;
//! session.set("visits", 1)?;
//! store.save(&session).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod filesystem_session;
pub mod memory_session;
pub mod traits;

pub use config::{DEFAULT_SESSION_TTL, SESSION_COOKIE_NAME, SessionBackend, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use filesystem_session::FileSystemSessionStore;
pub use memory_session::MemorySessionStore;
pub use traits::{Session, SessionStore, generate_session_id, is_valid_session_id};

use std::sync::Arc;

/// Build the store described by `config`.
pub fn store_from_config(config: &SessionConfig) -> SessionResult<Arc<dyn SessionStore>> {
    Ok(match &config.backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new(config.clone())),
        SessionBackend::FileSystem(_) => Arc::new(FileSystemSessionStore::from_config(config)?),
    })
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{SessionBackend, SessionConfig};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::filesystem_session::FileSystemSessionStore;
    pub use crate::memory_session::MemorySessionStore;
    pub use crate::traits::{Session, SessionStore, generate_session_id};
}
