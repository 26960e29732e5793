//! Configuration management with YAML support

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::store::StoreConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Number of pooled connections
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// How long `acquire()` waits for a free connection
    #[serde(default = "default_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// SQLite busy handler timeout per connection
    #[serde(default = "default_timeout_ms")]
    pub busy_timeout_ms: u64,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/slidecat/slidecat.db".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            pool_size: default_pool_size(),
            acquire_timeout_ms: default_timeout_ms(),
            busy_timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./slidecat.yaml (current directory)
    /// 3. ~/.config/slidecat/slidecat.yaml
    pub fn load(path: &str) -> Result<Self> {
        let search_paths = [
            shellexpand::tilde(path).to_string(),
            "slidecat.yaml".to_string(),
            shellexpand::tilde("~/.config/slidecat/slidecat.yaml").to_string(),
        ];

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)
                    .with_context(|| format!("reading config {search_path}"))?;
                let config: Config = serde_yaml::from_str(&content)
                    .with_context(|| format!("parsing config {search_path}"))?;
                tracing::debug!("Loaded config from {}", search_path);
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database.path).to_string();
        PathBuf::from(expanded)
    }

    /// Store settings derived from the `database` section
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self.database_path(),
            pool_size: self.database.pool_size,
            acquire_timeout: Duration::from_millis(self.database.acquire_timeout_ms),
            busy_timeout: Duration::from_millis(self.database.busy_timeout_ms),
        }
    }
}
