//! Byte-level key/value stores backing the cache.
//!
//! The engine only ever hands a `Storage` opaque bytes produced by
//! `CacheEntry::encode`. Backends do not interpret them.
//!
//! - `MemoryStorage`: unbounded map, the reference backend
//! - `MokaStorage`: bounded in-memory store with per-entry TTL
//! - `RedisStorage`: shared external store

mod memory;
mod moka;
mod redis;

pub use self::memory::MemoryStorage;
pub use self::moka::MokaStorage;
pub use self::redis::RedisStorage;

use bytes::Bytes;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StorageError;

/// Key/value store contract used by `CachedClient`.
///
/// Implementations are shared across concurrent requests and must be safe
/// to call from several tasks at once. Operations are synchronous so that
/// the streaming capture can store from inside `poll_frame`.
pub trait Storage: Send + Sync {
    /// Bytes stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// `ttl_seconds == 0` means "no expiry beyond the backend's own policy".
    fn set(&self, key: &str, value: Bytes, ttl_seconds: u64) -> Result<(), StorageError>;

    /// Remove `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Bytes, ttl_seconds: u64) -> Result<(), StorageError> {
        (**self).set(key, value, ttl_seconds)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key)
    }
}

/// Open the backend selected by `config`
pub fn open(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::Moka => Arc::new(MokaStorage::new(config.moka.max_capacity_bytes)),
        StorageBackend::Redis => {
            let redis = config.redis.as_ref().ok_or_else(|| {
                StorageError::Unavailable("redis backend selected without a redis section".to_string())
            })?;
            Arc::new(RedisStorage::connect(redis)?)
        }
    };
    tracing::info!(backend = ?config.backend, "storage backend ready");
    Ok(storage)
}
