//! Storage capability behind the feed cache.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable")]
    Unavailable,
    #[error("cache payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache backend error: {message}")]
    Backend { message: String },
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Key-value store with per-entry expiry. Implementations are shared across
/// request handlers; concurrent writes to one key are last-writer-wins.
pub trait CacheBackend: Send + Sync {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Whether the store can currently serve requests.
    fn is_available(&self) -> bool {
        true
    }

    /// Returns the stored value when present and not expired.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value`, replacing any existing entry, expiring after `ttl`.
    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes the entry regardless of its remaining lifetime. Returns whether
    /// an entry was present.
    fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

/// Backend used when caching is switched off or the store cannot be reached.
/// Every operation reports [`CacheError::Unavailable`], which the feed cache
/// treats as a miss or a failed write.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCacheBackend;

impl CacheBackend for DisabledCacheBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable)
    }

    fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable)
    }

    fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Unavailable)
    }
}
