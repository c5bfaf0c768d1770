//! In-process cache storage.
//!
//! LRU-bounded map with a per-entry deadline. Expired entries are never
//! returned and are evicted lazily when read.

use std::{
    sync::RwLock,
    time::{Duration, Instant},
};

use lru::LruCache;

use super::backend::{CacheBackend, CacheError};
use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Clone)]
struct Entry {
    payload: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

pub struct MemoryCacheBackend {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCacheBackend {
    /// Create a new store with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Drop every expired entry. Reads already ignore them; this only
    /// reclaims memory.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "purge_expired");
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let live = match entries.peek(key) {
            Some(entry) => entry.is_live(now),
            None => return Ok(None),
        };
        if !live {
            entries.pop(key);
            return Ok(None);
        }

        Ok(entries.get(key).map(|entry| entry.payload.clone()))
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "set");
        if ttl.is_zero() {
            entries.pop(key);
            return Ok(());
        }

        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::backend(format!("ttl of {ttl:?} overflows the clock")))?;
        entries.put(
            key.to_string(),
            Entry {
                payload: value,
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(rw_write(&self.entries, SOURCE, "delete")
            .pop(key)
            .is_some())
    }
}
