// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cache::CacheOptions;
use crate::error::{HttpCacheError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// TTL passed to the storage backend; 0 = backend default
    #[serde(default)]
    pub ttl_seconds: u64,
    #[serde(default = "default_mark_cached_responses")]
    pub mark_cached_responses: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 0,
            mark_cached_responses: default_mark_cached_responses(),
        }
    }
}

fn default_mark_cached_responses() -> bool {
    true
}

/// Storage backend types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Moka,
    Redis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub moka: MokaConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MokaConfig {
    #[serde(default = "default_max_capacity_bytes")]
    pub max_capacity_bytes: u64,
}

impl Default for MokaConfig {
    fn default() -> Self {
        Self {
            max_capacity_bytes: default_max_capacity_bytes(),
        }
    }
}

fn default_max_capacity_bytes() -> u64 {
    256 * 1024 * 1024 // 256MB
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
    /// Connect timeout in milliseconds
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    /// Per-command read/write timeout in milliseconds
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

fn default_redis_key_prefix() -> String {
    "httpcache".to_string()
}

fn default_connection_timeout_ms() -> u64 {
    5000
}

fn default_operation_timeout_ms() -> u64 {
    2000
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Parse YAML, replacing every `${VAR_NAME}` with the environment value.
    ///
    /// Referencing an unset variable is an error.
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| HttpCacheError::Config(e.to_string()))?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            })
        });
        if let Some(var_name) = missing {
            return Err(HttpCacheError::Config(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            )));
        }

        serde_yaml::from_str(&substituted).map_err(|e| HttpCacheError::Config(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| HttpCacheError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        match self.storage.backend {
            StorageBackend::Memory => {}
            StorageBackend::Moka => {
                if self.storage.moka.max_capacity_bytes == 0 {
                    return Err(HttpCacheError::Config(
                        "storage.moka.max_capacity_bytes must be greater than 0".to_string(),
                    ));
                }
            }
            StorageBackend::Redis => match &self.storage.redis {
                Some(redis) if !redis.url.trim().is_empty() => {
                    if redis.connection_timeout_ms == 0 || redis.operation_timeout_ms == 0 {
                        return Err(HttpCacheError::Config(
                            "storage.redis timeouts must be greater than 0".to_string(),
                        ));
                    }
                }
                _ => {
                    return Err(HttpCacheError::Config(
                        "storage.redis.url is required for the redis backend".to_string(),
                    ))
                }
            },
        }
        Ok(())
    }

    /// Runtime options for `CachedClient`
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            ttl_seconds: self.cache.ttl_seconds,
            mark_cached_responses: self.cache.mark_cached_responses,
        }
    }
}
