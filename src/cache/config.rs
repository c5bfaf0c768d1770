//! Cache configuration.
//!
//! Controls the feed cache backend via `agora.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 256
//! feed_ttl_seconds = 300
//! invalidate_pages = 5
//! ```

use std::{num::NonZeroUsize, time::Duration};

const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_FEED_TTL_SECS: u64 = 300;
const DEFAULT_INVALIDATE_PAGES: u32 = 5;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Use the in-process backend. When false every lookup misses.
    pub enabled: bool,
    /// Maximum entries held by the in-process backend.
    pub capacity: usize,
    /// Lifetime of a cached feed page.
    pub feed_ttl_seconds: u64,
    /// Number of leading feed pages dropped after a content write.
    pub invalidate_pages: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            feed_ttl_seconds: DEFAULT_FEED_TTL_SECS,
            invalidate_pages: DEFAULT_INVALIDATE_PAGES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            capacity: settings.capacity.get(),
            feed_ttl_seconds: settings.feed_ttl.as_secs(),
            invalidate_pages: settings.invalidate_pages,
        }
    }
}

impl CacheConfig {
    pub fn feed_ttl(&self) -> Duration {
        Duration::from_secs(self.feed_ttl_seconds)
    }

    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
