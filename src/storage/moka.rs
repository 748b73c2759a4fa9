// Bounded in-memory storage on moka

use bytes::Bytes;
use moka::sync::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use super::Storage;
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Bytes,
    ttl_seconds: u64,
}

impl StoredValue {
    fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }
}

/// Per-entry expiry driven by the TTL passed to `set`
struct TtlExpiry;

impl Expiry<String, StoredValue> for TtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl()
    }
}

/// Size-bounded store; least recently used entries are evicted once the
/// total weight exceeds `max_capacity_bytes`.
pub struct MokaStorage {
    cache: Cache<String, StoredValue>,
    max_capacity_bytes: u64,
}

impl MokaStorage {
    pub fn new(max_capacity_bytes: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity_bytes)
            .weigher(|key: &String, value: &StoredValue| {
                let size = key.len() + value.bytes.len();
                if size > u32::MAX as usize {
                    u32::MAX
                } else {
                    size as u32
                }
            })
            .expire_after(TtlExpiry)
            .build();

        Self {
            cache,
            max_capacity_bytes,
        }
    }

    /// Forces moka to process pending evictions and expirations
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }

    /// Approximate number of live entries
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn weighted_size(&self) -> u64 {
        self.cache.weighted_size()
    }
}

impl Storage for MokaStorage {
    fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.cache.get(key).map(|value| value.bytes))
    }

    fn set(&self, key: &str, value: Bytes, ttl_seconds: u64) -> Result<(), StorageError> {
        let size = key.len() + value.len();
        if size as u64 > self.max_capacity_bytes {
            return Err(StorageError::Capacity { size });
        }
        self.cache.insert(
            key.to_string(),
            StoredValue {
                bytes: value,
                ttl_seconds,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.cache.invalidate(key);
        Ok(())
    }
}
