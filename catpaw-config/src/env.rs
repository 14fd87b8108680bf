// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Prefix of the variables read by [`EnvLoader::catpaw`].
pub const DEFAULT_ENV_PREFIX: &str = "CATPAW";

/// Environment variable loader
///
/// Variable names map to configuration keys by dropping the prefix,
/// lowercasing and turning `__` into `.`:
/// `CATPAW_SERVER__MAX_CONNECTIONS` becomes `server.max_connections`.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for `CATPAW_` variables.
    pub fn catpaw() -> Self {
        Self::new(Some(DEFAULT_ENV_PREFIX.to_string()))
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Load all matching environment variables, keyed by configuration key.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.load_from(env::vars()))
    }

    /// Same as [`load`](Self::load) over an explicit set of variables.
    pub fn load_from<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(name, value)| self.config_key(&name).map(|key| (key, value)))
            .collect()
    }

    /// Configuration key for a variable name, `None` when the prefix does not match.
    pub fn config_key(&self, name: &str) -> Option<String> {
        let trimmed = match &self.prefix {
            Some(prefix) => {
                let rest = name.strip_prefix(prefix.as_str())?;
                rest.strip_prefix('_')?
            }
            None => name,
        };
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_lowercase().replace("__", "."))
    }

    /// Variable name for a configuration key.
    pub fn var_name(&self, key: &str) -> String {
        let name = key.replace('.', "__").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name,
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}
