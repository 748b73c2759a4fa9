// Unbounded in-memory storage

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::Storage;
use crate::error::StorageError;

/// Map guarded by a reader/writer lock.
///
/// Entries never expire and the map never shrinks on its own; TTLs passed to
/// `set` are ignored.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Bytes, _ttl_seconds: u64) -> Result<(), StorageError> {
        self.items.write().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.items.write().remove(key);
        Ok(())
    }
}
