// Redis-backed shared storage

use bytes::Bytes;
use parking_lot::Mutex;
use redis::Commands;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::Storage;
use crate::config::RedisConfig;
use crate::error::StorageError;

/// Keys longer than this are replaced by a SHA-256 digest
pub const MAX_KEY_LENGTH: usize = 250;

/// Formats the Redis key for a request key.
///
/// - Short keys: `{prefix}:{key}`
/// - Long keys: `{prefix}:hash:{sha256}`
pub fn format_key(prefix: &str, key: &str) -> String {
    let full_key = format!("{}:{}", prefix, key);
    if full_key.len() > MAX_KEY_LENGTH {
        let hash = Sha256::digest(key.as_bytes());
        format!("{}:hash:{}", prefix, hex::encode(hash))
    } else {
        full_key
    }
}

/// Run a blocking Redis call.
///
/// On a multi-threaded tokio runtime the worker hands its other tasks off
/// first. `block_in_place` panics on a current-thread runtime, so there
/// (and outside any runtime) the call runs inline.
fn blocking<T>(call: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(call)
        }
        _ => call(),
    }
}

fn timeout(name: &str, millis: u64) -> Result<Duration, StorageError> {
    if millis == 0 {
        return Err(StorageError::Unavailable(format!(
            "redis {} must be greater than 0",
            name
        )));
    }
    Ok(Duration::from_millis(millis))
}

/// Storage over a single blocking Redis connection.
///
/// The connection is serialized behind a mutex; every command is a single
/// round trip bounded by the operation timeout.
pub struct RedisStorage {
    connection: Mutex<redis::Connection>,
    key_prefix: String,
}

impl RedisStorage {
    /// Connect using `config.url` (e.g. `redis://127.0.0.1:6379`)
    pub fn connect(config: &RedisConfig) -> Result<Self, StorageError> {
        let connect_timeout = timeout("connection_timeout_ms", config.connection_timeout_ms)?;
        let operation_timeout = timeout("operation_timeout_ms", config.operation_timeout_ms)?;

        let client = redis::Client::open(config.url.as_str())?;
        let connection = blocking(|| -> Result<redis::Connection, StorageError> {
            let connection = client.get_connection_with_timeout(connect_timeout)?;
            connection.set_read_timeout(Some(operation_timeout))?;
            connection.set_write_timeout(Some(operation_timeout))?;
            Ok(connection)
        })?;

        tracing::info!(
            url = %config.url,
            connection_timeout_ms = config.connection_timeout_ms,
            operation_timeout_ms = config.operation_timeout_ms,
            "connected to redis"
        );
        Ok(Self {
            connection: Mutex::new(connection),
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn redis_key(&self, key: &str) -> String {
        format_key(&self.key_prefix, key)
    }
}

impl Storage for RedisStorage {
    fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let redis_key = self.redis_key(key);
        let value: Option<Vec<u8>> = blocking(|| self.connection.lock().get(redis_key))?;
        Ok(value.map(Bytes::from))
    }

    fn set(&self, key: &str, value: Bytes, ttl_seconds: u64) -> Result<(), StorageError> {
        let redis_key = self.redis_key(key);
        blocking(|| {
            let mut connection = self.connection.lock();
            if ttl_seconds > 0 {
                connection.set_ex::<_, _, ()>(redis_key, value.as_ref(), ttl_seconds)
            } else {
                connection.set::<_, _, ()>(redis_key, value.as_ref())
            }
        })?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let redis_key = self.redis_key(key);
        let _: i64 = blocking(|| self.connection.lock().del(redis_key))?;
        Ok(())
    }
}
