//! Key-value persistence capability.
//!
//! The aggregator persists resource metadata through [`KeyValueStore`], a
//! flat string-to-string space comparable to browser local storage. Any
//! operation may fail (storage denied, full or disabled); the
//! [`ResourceCache`](crate::cache::ResourceCache) absorbs those failures.

use std::sync::Arc;

use moka::sync::Cache;

use crate::error::StoreError;

/// Default number of entries held by a [`MemoryStore`].
pub const DEFAULT_MEMORY_ENTRIES: u64 = 10_000;

/// A flat string key-value store.
///
/// Implementations must be `Send + Sync`; the store is shared by all
/// sessions of an aggregator.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Whether `key` is stored.
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        (**self).exists(key)
    }
}

/// Bounded in-memory store.
///
/// Once the capacity is reached moka's TinyLFU policy decides which
/// entries to admit and evict. Any key can go, session-level fields such as
/// the federation id included; a forgotten federation is set again by the
/// next mother response that names it.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, String>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_ENTRIES)
    }
}

impl MemoryStore {
    /// Store with [`DEFAULT_MEMORY_ENTRIES`] capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding at most `max_entries` entries.
    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.invalidate(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.iter().map(|(k, _)| (*k).clone()).collect())
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.contains_key(key))
    }
}

/// A store that refuses every operation, as when persistence is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStore;

impl KeyValueStore for DisabledStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("persistence disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("persistence disabled".into()))
    }

    fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("persistence disabled".into()))
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("persistence disabled".into()))
    }
}
