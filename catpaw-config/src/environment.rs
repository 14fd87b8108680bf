//! Application environment files.
//!
//! An application usually ships one environment file among several possible
//! locations. [`EnvironmentService::load_first`] loads the first one that
//! exists, and [`server_config`] reads the `server` table into a
//! [`ServerConfig`]:
//!
//! ```ini
//! [server]
//! interface = 0.0.0.0:8080
//! www = ./public
//! spa = on
//! ```

use crate::{ConfigError, ConfigLoader, ConfigManager, Result};
use catpaw_core::{Provider, ServerConfig};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Locations tried by [`EnvironmentService::load_default`], in order.
pub const DEFAULT_ENVIRONMENT_FILES: [&str; 7] = [
    "env.ini",
    "env.yaml",
    "env.yml",
    ".env",
    "resources/env.ini",
    "resources/env.yml",
    "resources/.env",
];

/// Variables of the application environment file.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentService {
    manager: ConfigManager,
    file: Arc<RwLock<Option<PathBuf>>>,
}

impl EnvironmentService {
    pub fn new(manager: ConfigManager) -> Self {
        Self {
            manager,
            file: Arc::default(),
        }
    }

    pub fn with_file_name(self, file: impl Into<PathBuf>) -> Self {
        *self.file.write() = Some(file.into());
        self
    }

    /// File loaded last, or set with [`with_file_name`](Self::with_file_name).
    pub fn file_name(&self) -> Option<PathBuf> {
        self.file.read().clone()
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }

    /// Parse the environment file and merge its variables.
    ///
    /// May be called again after the file changed.
    pub fn load(&self) -> Result<()> {
        let file = self
            .file_name()
            .ok_or_else(|| ConfigError::EnvironmentNotFound(Vec::new()))?;
        self.load_file(&file)
    }

    /// Load the first of `candidates` that exists and remember it.
    pub fn load_first<P: AsRef<Path>>(&self, candidates: &[P]) -> Result<PathBuf> {
        let found = candidates
            .iter()
            .map(|candidate| candidate.as_ref())
            .find(|candidate| candidate.is_file());

        let Some(file) = found else {
            let tried = candidates
                .iter()
                .map(|c| c.as_ref().display().to_string())
                .collect();
            return Err(ConfigError::EnvironmentNotFound(tried));
        };

        self.load_file(file)?;
        *self.file.write() = Some(file.to_path_buf());
        Ok(file.to_path_buf())
    }

    /// [`load_first`](Self::load_first) over [`DEFAULT_ENVIRONMENT_FILES`].
    pub fn load_default(&self) -> Result<PathBuf> {
        self.load_first(&DEFAULT_ENVIRONMENT_FILES)
    }

    fn load_file(&self, file: &Path) -> Result<()> {
        let loader = ConfigLoader::auto(file)?;
        let data = loader.load_file(file)?;
        self.manager.merge_value(data);
        info!(file = %file.display(), "Environment loaded");
        Ok(())
    }

    /// Merge the process environment over the file variables.
    ///
    /// This may overwrite keys of the environment file; call
    /// [`load`](Self::load) again to get them back.
    pub fn include_system_environment(&self) -> Result<()> {
        self.manager.load_env()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.manager.value(key)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        self.manager.set(key, value)
    }

    pub fn clear(&self) {
        self.manager.clear();
    }
}

impl Provider for EnvironmentService {}

/// Server settings from the `server` table, defaults for missing keys.
///
/// Keys: `interface`, `api_prefix`, `www`, `spa`, `max_connections`,
/// `max_body_size`, `expose_errors` and `shutdown_timeout` (seconds).
pub fn server_config(config: &ConfigManager) -> Result<ServerConfig> {
    let mut server = ServerConfig::default();
    let key = |name: &str| format!("server.{name}");

    if config.has(&key("interface")) {
        server.interface = config.get_string(&key("interface"))?;
    }
    if config.has(&key("api_prefix")) {
        server.api_prefix = config.get_string(&key("api_prefix"))?;
    }
    if config.has(&key("www")) {
        let www = config.get_string(&key("www"))?;
        server.statics_location = (!www.is_empty()).then(|| PathBuf::from(www));
    }
    if config.has(&key("spa")) {
        server.spa = config.get_bool(&key("spa"))?;
    }
    if config.has(&key("max_connections")) {
        server.max_connections = positive(&key("max_connections"), config.get_int(&key("max_connections"))?)?;
    }
    if config.has(&key("max_body_size")) {
        server.max_body_size = positive(&key("max_body_size"), config.get_int(&key("max_body_size"))?)?;
    }
    if config.has(&key("expose_errors")) {
        server.expose_errors = config.get_bool(&key("expose_errors"))?;
    }
    if config.has(&key("shutdown_timeout")) {
        let seconds: u64 = positive(&key("shutdown_timeout"), config.get_int(&key("shutdown_timeout"))?)?;
        server.shutdown_timeout = Duration::from_secs(seconds);
    }

    debug!(interface = %server.interface, www = ?server.statics_location, "Server configuration read");
    Ok(server)
}

fn positive<T: TryFrom<i64>>(key: &str, value: i64) -> Result<T> {
    T::try_from(value)
        .map_err(|_| ConfigError::DeserializationError(format!("{key}: {value} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_first_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("env.ini");
        fs::write(&ini, "[server]\nwww = ./public\n").unwrap();

        let service = EnvironmentService::default();
        let missing = dir.path().join("env.yml");
        let loaded = service.load_first(&[missing, ini.clone()]).unwrap();

        assert_eq!(loaded, ini);
        assert_eq!(service.file_name(), Some(ini));
        assert_eq!(service.get("server.www"), Some(Value::from("./public")));
    }

    #[test]
    fn test_no_environment_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = EnvironmentService::default();

        let error = service.load_first(&[dir.path().join("env.ini")]).unwrap_err();
        assert!(matches!(error, ConfigError::EnvironmentNotFound(ref tried) if tried.len() == 1));
        assert!(service.load().is_err());
    }

    #[test]
    fn test_reload_after_clear() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("env.yaml");
        fs::write(&yaml, "name: paws\n").unwrap();

        let service = EnvironmentService::default().with_file_name(&yaml);
        service.load().unwrap();
        service.clear();
        assert_eq!(service.get("name"), None);

        service.load().unwrap();
        assert_eq!(service.get("name"), Some(Value::from("paws")));
    }

    #[test]
    fn test_server_config_defaults() {
        let config = server_config(&ConfigManager::new()).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_server_config_from_values() {
        let manager = ConfigManager::new();
        manager.set("server.interface", "0.0.0.0:9000").unwrap();
        manager.set("server.www", "./public").unwrap();
        manager.set("server.spa", "yes").unwrap();
        manager.set("server.api_prefix", "/api").unwrap();
        manager.set("server.max_connections", "16").unwrap();
        manager.set("server.shutdown_timeout", 5).unwrap();

        let config = server_config(&manager).unwrap();
        assert_eq!(config.interface, "0.0.0.0:9000");
        assert_eq!(config.statics_location, Some(PathBuf::from("./public")));
        assert!(config.spa);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));

        manager.set("server.max_connections", -1).unwrap();
        assert!(server_config(&manager).is_err());
    }
}
