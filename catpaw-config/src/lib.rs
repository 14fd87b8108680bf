// Configuration management for CatPaw applications
//
// Keys are dot paths into a tree of JSON values: `server.www` reads the
// `www` entry of the `server` table.

pub mod attribute;
pub mod config_service;
pub mod env;
pub mod environment;
pub mod error;
pub mod loader;

pub use attribute::Env;
pub use config_service::{ConfigService, ConfigServiceBuilder};
pub use env::{DEFAULT_ENV_PREFIX, EnvLoader};
pub use environment::{DEFAULT_ENVIRONMENT_FILES, EnvironmentService, server_config};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use catpaw_core::Provider;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Main configuration manager
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    values: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            values: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let vars = loader.load()?;
        self.apply_env(vars)
    }

    /// Load the given variables as if they were the process environment.
    pub fn load_env_vars<I>(&self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.apply_env(loader.load_from(vars))
    }

    fn apply_env(&self, vars: impl IntoIterator<Item = (String, String)>) -> Result<()> {
        let mut count = 0;
        for (key, value) in vars {
            self.set(&key, value)?;
            count += 1;
        }
        debug!(count, prefix = ?self.env_prefix, "Loaded environment variables");
        Ok(())
    }

    /// Load a `.env` file. Without a path, `./.env` is tried and may be missing.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => self.load_file(path, FileFormat::Env),
            None if Path::new(".env").is_file() => self.load_file(".env", FileFormat::Env),
            None => Ok(()),
        }
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data);
        debug!(path = %path.display(), format = ?format, "Loaded configuration file");
        Ok(())
    }

    /// Load a file, picking the format from its name.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let loader = ConfigLoader::auto(path)?;
        self.load_file(path, loader.format())
    }

    /// Merge a table of values, nested tables are merged key by key.
    pub fn merge_value(&self, data: Value) {
        if let Value::Object(map) = data {
            let mut values = self.values.write();
            merge_maps(&mut values, map);
        }
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        let mut values = self.values.write();
        insert(&mut values, key, value)
    }

    /// Raw value at `key`.
    ///
    /// A top-level entry whose name contains dots wins over the nested lookup.
    pub fn value(&self, key: &str) -> Option<Value> {
        let values = self.values.read();
        lookup(&values, key).cloned()
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.require(key)?;
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(format!("{key}: {e}")))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Get a string value, numbers and booleans are rendered as text
    pub fn get_string(&self, key: &str) -> Result<String> {
        match self.require(key)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(mismatch(key, "a string", &other)),
        }
    }

    /// Get an integer value, numeric strings are accepted
    pub fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.require(key)?;
        let int = match &value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        int.ok_or_else(|| mismatch(key, "an integer", &value))
    }

    /// Get a float value, numeric strings are accepted
    pub fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        let float = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        float.ok_or_else(|| mismatch(key, "a number", &value))
    }

    /// Get a boolean value; `1`, `true`, `on`, `yes` and their opposites are accepted
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        let flag = match &value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(true),
                "" | "0" | "false" | "off" | "no" | "none" => Some(false),
                _ => None,
            },
            Value::Null => Some(false),
            _ => None,
        };
        flag.ok_or_else(|| mismatch(key, "a boolean", &value))
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        let values = self.values.read();
        lookup(&values, key).is_some()
    }

    /// Top-level keys
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut values = self.values.write();
        if let Some(value) = values.remove(key) {
            return Some(value);
        }
        let (parent, last) = key.rsplit_once('.')?;
        let mut current = &mut *values;
        for segment in parent.split('.') {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        current.remove(last)
    }

    pub fn clear(&self) {
        self.values.write().clear();
    }

    /// Copy of every value as one JSON object.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.read().clone())
    }

    /// Merge configuration from another manager
    pub fn merge(&self, other: &ConfigManager) {
        let snapshot = other.snapshot();
        self.merge_value(snapshot);
    }

    fn require(&self, key: &str) -> Result<Value> {
        self.value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }
}

impl Provider for ConfigManager {}

fn mismatch(key: &str, expected: &str, found: &Value) -> ConfigError {
    ConfigError::DeserializationError(format!("{key}: expected {expected}, found {found}"))
}

fn lookup<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = root.get(key) {
        return Some(value);
    }
    let mut segments = key.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn insert(root: &mut Map<String, Value>, key: &str, value: Value) -> Result<()> {
    if key.split('.').any(str::is_empty) {
        return Err(ConfigError::InvalidKey(key.to_string()));
    }

    let (parent, last) = match key.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, key),
    };

    let mut current = root;
    for segment in parent.into_iter().flat_map(|p| p.split('.')) {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry
            .as_object_mut()
            .ok_or_else(|| ConfigError::InvalidKey(key.to_string()))?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn merge_maps(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                merge_maps(existing, incoming);
                continue;
            }
            target.insert(key, Value::Object(incoming));
        } else {
            target.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("test_key", "test_value").unwrap();

        let value: String = manager.get("test_key").unwrap();
        assert_eq!(value, "test_value");
    }

    #[test]
    fn test_dot_paths() {
        let manager = ConfigManager::new();
        manager.set("server.www", "./public").unwrap();
        manager.set("server.spa", true).unwrap();

        assert_eq!(manager.get_string("server.www").unwrap(), "./public");
        assert_eq!(manager.value("server").unwrap(), json!({ "www": "./public", "spa": true }));
        assert!(!manager.has("server.www.index"));
    }

    #[test]
    fn test_set_replaces_scalar_parents() {
        let manager = ConfigManager::new();
        manager.set("server", "off").unwrap();
        manager.set("server.www", "./public").unwrap();
        assert_eq!(manager.snapshot(), json!({ "server": { "www": "./public" } }));

        assert!(matches!(manager.set("server..www", 1), Err(ConfigError::InvalidKey(_))));
        assert!(manager.set("", 1).is_err());
    }

    #[test]
    fn test_exact_key_wins() {
        let manager = ConfigManager::new();
        manager.merge_value(json!({ "a.b": "flat", "a": { "b": "nested" } }));
        assert_eq!(manager.get_string("a.b").unwrap(), "flat");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
        assert!(matches!(manager.get_int("missing_key"), Err(ConfigError::KeyNotFound(_))));
    }

    #[test]
    fn test_type_conversions() {
        let manager = ConfigManager::new();

        manager.set("string_key", "hello").unwrap();
        manager.set("int_key", 42i64).unwrap();
        manager.set("bool_key", true).unwrap();
        manager.set("float_key", 3.5).unwrap();
        manager.set("text_int", "8080").unwrap();
        manager.set("text_bool", "on").unwrap();

        assert_eq!(manager.get_string("string_key").unwrap(), "hello");
        assert_eq!(manager.get_int("int_key").unwrap(), 42);
        assert!(manager.get_bool("bool_key").unwrap());
        assert_eq!(manager.get_float("float_key").unwrap(), 3.5);
        assert_eq!(manager.get_int("text_int").unwrap(), 8080);
        assert_eq!(manager.get_string("int_key").unwrap(), "42");
        assert!(manager.get_bool("text_bool").unwrap());
        assert!(manager.get_int("string_key").is_err());
    }

    #[test]
    fn test_deep_merge() {
        let manager = ConfigManager::new();
        manager.merge_value(json!({ "server": { "www": "./public", "spa": false } }));
        manager.merge_value(json!({ "server": { "spa": true } }));

        assert_eq!(manager.get_string("server.www").unwrap(), "./public");
        assert!(manager.get_bool("server.spa").unwrap());
    }

    #[test]
    fn test_env_vars_use_prefix() {
        let manager = ConfigManager::with_prefix("CATPAW");
        manager
            .load_env_vars([
                ("CATPAW_SERVER__INTERFACE".to_string(), "0.0.0.0:80".to_string()),
                ("PATH".to_string(), "/bin".to_string()),
            ])
            .unwrap();

        assert_eq!(manager.get_string("server.interface").unwrap(), "0.0.0.0:80");
        assert!(!manager.has("path"));
    }

    #[test]
    fn test_remove_and_clear() {
        let manager = ConfigManager::new();
        manager.set("server.www", "./public").unwrap();
        manager.set("name", "paws").unwrap();

        assert_eq!(manager.remove("server.www"), Some(json!("./public")));
        assert_eq!(manager.remove("server.www"), None);
        assert!(manager.has("server"));

        manager.clear();
        assert!(manager.keys().is_empty());
    }
}
