//! Best-effort cache-aside wrapper used by the feed read and write paths.
//!
//! Every backend failure is recovered here: reads degrade to a miss and
//! writes report `false`. Nothing in this module can fail a request.

use std::{sync::Arc, time::Duration};

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::backend::{CacheBackend, CacheError, DisabledCacheBackend};
use super::config::CacheConfig;
use super::keys::{feed_page_key, invalidated_pages};
use super::store::MemoryCacheBackend;

pub(crate) const METRIC_FEED_CACHE_HIT_TOTAL: &str = "agora_feed_cache_hit_total";
pub(crate) const METRIC_FEED_CACHE_MISS_TOTAL: &str = "agora_feed_cache_miss_total";
pub(crate) const METRIC_FEED_CACHE_ERROR_TOTAL: &str = "agora_feed_cache_error_total";
pub(crate) const METRIC_FEED_CACHE_INVALIDATE_TOTAL: &str = "agora_feed_cache_invalidate_total";

const SOURCE: &str = "cache::feed";

#[derive(Clone)]
pub struct FeedCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    invalidate_pages: u32,
}

impl FeedCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            ttl: config.feed_ttl(),
            invalidate_pages: config.invalidate_pages,
        }
    }

    /// Build the cache with the backend selected by `config`.
    pub fn from_config(config: &CacheConfig) -> Self {
        let backend: Arc<dyn CacheBackend> = if config.enabled {
            Arc::new(MemoryCacheBackend::new(config))
        } else {
            Arc::new(DisabledCacheBackend)
        };
        Self::new(backend, config)
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledCacheBackend), &CacheConfig::default())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Lifetime applied to feed pages.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached payload when present, unexpired and decodable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counter!(METRIC_FEED_CACHE_MISS_TOTAL).increment(1);
                return None;
            }
            Err(error) => {
                self.report("get", key, &error);
                counter!(METRIC_FEED_CACHE_MISS_TOTAL).increment(1);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(payload) => {
                counter!(METRIC_FEED_CACHE_HIT_TOTAL).increment(1);
                Some(payload)
            }
            Err(error) => {
                self.report("decode", key, &CacheError::from(error));
                counter!(METRIC_FEED_CACHE_MISS_TOTAL).increment(1);
                // An undecodable entry would keep missing until it expires.
                let _ = self.backend.delete(key);
                None
            }
        }
    }

    /// Stores `payload` under `key`, replacing any existing entry. Returns
    /// whether the backend accepted the write.
    pub fn set<T: Serialize>(&self, key: &str, payload: &T, ttl: Duration) -> bool {
        let result = serde_json::to_string(payload)
            .map_err(CacheError::from)
            .and_then(|raw| self.backend.set(key, raw, ttl));

        match result {
            Ok(()) => true,
            Err(error) => {
                self.report("set", key, &error);
                false
            }
        }
    }

    /// Removes `key` immediately, regardless of its remaining lifetime.
    /// Returns whether the backend processed the removal.
    pub fn invalidate(&self, key: &str) -> bool {
        match self.backend.delete(key) {
            Ok(_) => {
                counter!(METRIC_FEED_CACHE_INVALIDATE_TOTAL).increment(1);
                true
            }
            Err(error) => {
                self.report("invalidate", key, &error);
                false
            }
        }
    }

    /// Drops the leading feed pages after a content write. Returns whether
    /// every page was invalidated.
    pub fn invalidate_feed(&self) -> bool {
        let mut all_removed = true;
        for page in invalidated_pages(self.invalidate_pages) {
            all_removed &= self.invalidate(&feed_page_key(page));
        }
        debug!(
            target = SOURCE,
            pages = self.invalidate_pages,
            backend = self.backend.name(),
            all_removed,
            "Invalidated feed pages"
        );
        all_removed
    }

    fn report(&self, op: &'static str, key: &str, error: &CacheError) {
        counter!(METRIC_FEED_CACHE_ERROR_TOTAL, "op" => op).increment(1);
        if matches!(error, CacheError::Unavailable) {
            debug!(
                target = SOURCE,
                op,
                key,
                backend = self.backend.name(),
                "Cache unavailable; continuing without it"
            );
        } else {
            warn!(
                target = SOURCE,
                op,
                key,
                backend = self.backend.name(),
                error = %error,
                "Cache operation failed; continuing without it"
            );
        }
    }
}
