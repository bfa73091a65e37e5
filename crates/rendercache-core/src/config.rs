//! `RenderCache` configuration module.
//!
//! Provides configuration file support via `rendercache.toml`, environment
//! variables, and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides ([`MemoCache::set_max_size`](crate::MemoCache::set_max_size))
//! 2. Environment variables (`RENDERCACHE_*`)
//! 3. Configuration file (`rendercache.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default byte budget: 64 MiB covers a typical compiled-shader working set.
pub const DEFAULT_MAX_BYTES: u64 = 64 * 1024 * 1024;

/// Default key-map capacity hint.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Upper bound on the capacity hint; larger values are almost certainly a
/// mistyped environment override.
const MAX_INITIAL_CAPACITY: usize = 1 << 22;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file or environment.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum accounted bytes before eviction kicks in.
    ///
    /// `0` disables caching entirely: every lookup invokes the builder and
    /// nothing is retained.
    pub max_bytes: u64,
    /// Initial capacity hint for the key map and recency list.
    pub initial_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Loads configuration from an optional TOML file, merged with
    /// `RENDERCACHE_*` environment variables over built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed("RENDERCACHE_"))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(ConfigError::InvalidValue {
                key: "initial_capacity".to_string(),
                message: format!(
                    "{} exceeds maximum of {}",
                    self.initial_capacity, MAX_INITIAL_CAPACITY
                ),
            });
        }
        Ok(())
    }
}
