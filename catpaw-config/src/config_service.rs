// ConfigService - High-level configuration service

use crate::{ConfigManager, FileFormat, Result};
use catpaw_core::Provider;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// High-level configuration service
#[derive(Debug, Clone, Default)]
pub struct ConfigService {
    manager: ConfigManager,
}

impl ConfigService {
    /// Create a new configuration service
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an existing manager
    pub fn from_manager(manager: ConfigManager) -> Self {
        Self { manager }
    }

    /// Builder for creating configured service
    pub fn builder() -> ConfigServiceBuilder {
        ConfigServiceBuilder::new()
    }

    /// Get configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.manager.get(key)
    }

    /// Get configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.manager.get_or(key, default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.manager.get_string(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.manager.get_int(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.manager.get_float(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.manager.get_bool(key)
    }

    /// Check if key exists
    pub fn has(&self, key: &str) -> bool {
        self.manager.has(key)
    }

    /// Get underlying manager
    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }
}

impl Provider for ConfigService {}

/// Builder for ConfigService
///
/// Sources are applied in order: `.env` file, configuration files, then
/// environment variables, so the process environment has the last word.
#[derive(Debug, Default)]
pub struct ConfigServiceBuilder {
    prefix: Option<String>,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    config_files: Vec<(PathBuf, Option<FileFormat>)>,
}

impl ConfigServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Enable loading from .env file
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add configuration file to load
    pub fn add_file(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.config_files.push((path.into(), Some(format)));
        self
    }

    /// Add a configuration file whose format follows from its name
    pub fn add_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push((path.into(), None));
        self
    }

    /// Build the configuration service
    pub fn build(self) -> Result<ConfigService> {
        let manager = match self.prefix {
            Some(prefix) => ConfigManager::with_prefix(prefix),
            None => ConfigManager::new(),
        };

        if self.load_dotenv {
            manager.load_dotenv(self.dotenv_path.as_deref())?;
        }

        for (path, format) in self.config_files {
            match format {
                Some(format) => manager.load_file(&path, format)?,
                None => manager.load_path(&path)?,
            }
        }

        if self.load_env {
            manager.load_env()?;
        }

        Ok(ConfigService::from_manager(manager))
    }
}
