use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};

/// Operator applied between two clauses written side by side without AND/OR/NOT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for committed index checkpoints; `None` keeps the index in memory only
    pub storage_path: Option<PathBuf>,
    pub query_cache_size: usize,

    // Federated search
    pub remote_timeout_ms: u64,

    // Query validation
    pub max_query_depth: usize,
    pub max_bool_clauses: usize,

    /// Batches larger than this are analyzed on the rayon pool
    pub parallel_batch_threshold: usize,

    pub catalog_crs: String,
    pub default_field: String,
    pub default_operator: BooleanOperator,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: None,
            query_cache_size: 1000,
            remote_timeout_ms: 5_000,
            max_query_depth: 16,
            max_bool_clauses: 1024,
            parallel_batch_threshold: 100,
            catalog_crs: "CRS:84".to_string(),
            default_field: "_all".to_string(),
            default_operator: BooleanOperator::Or,
        }
    }
}

impl Config {
    /// Load a JSON config file; missing keys fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            Error::invalid_config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var("METACAT_STORAGE_PATH") {
            self.storage_path = Some(PathBuf::from(path));
        }
        if let Ok(raw) = std::env::var("METACAT_REMOTE_TIMEOUT_MS") {
            self.remote_timeout_ms = raw.parse().map_err(|_| {
                Error::invalid_config(format!("METACAT_REMOTE_TIMEOUT_MS is not a number: {}", raw))
            })?;
        }
        if let Ok(raw) = std::env::var("METACAT_QUERY_CACHE_SIZE") {
            self.query_cache_size = raw.parse().map_err(|_| {
                Error::invalid_config(format!("METACAT_QUERY_CACHE_SIZE is not a number: {}", raw))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.remote_timeout_ms == 0 {
            return Err(Error::invalid_config("remote_timeout_ms must be positive"));
        }
        if self.query_cache_size == 0 {
            return Err(Error::invalid_config("query_cache_size must be positive"));
        }
        if self.max_query_depth == 0 || self.max_bool_clauses == 0 {
            return Err(Error::invalid_config("query limits must be positive"));
        }
        if self.default_field.is_empty() {
            return Err(Error::invalid_config("default_field must not be empty"));
        }
        Ok(())
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}
