//! Feed page cache.
//!
//! Cache-aside storage for rendered feed pages:
//!
//! - **Backends** implement [`CacheBackend`]. The in-process
//!   [`MemoryCacheBackend`] is LRU-bounded with per-entry expiry;
//!   [`DisabledCacheBackend`] stands in when caching is off.
//! - **[`FeedCache`]** wraps a backend and absorbs every failure, so a
//!   broken cache degrades to recomputation instead of an error.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! feed_ttl_seconds = 300
//! invalidate_pages = 5
//! # ... see config.rs for all options
//! ```

mod backend;
mod config;
mod feed;
mod keys;
mod lock;
mod store;

pub use backend::{CacheBackend, CacheError, DisabledCacheBackend};
pub use config::CacheConfig;
pub use feed::FeedCache;
pub(crate) use feed::{
    METRIC_FEED_CACHE_ERROR_TOTAL, METRIC_FEED_CACHE_HIT_TOTAL, METRIC_FEED_CACHE_INVALIDATE_TOTAL,
    METRIC_FEED_CACHE_MISS_TOTAL,
};
pub use keys::{FEED_PAGE_KEY_PREFIX, feed_page_key, invalidated_pages};
pub use store::MemoryCacheBackend;
