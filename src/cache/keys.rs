//! Cache key derivation for the public feed.

use std::ops::RangeInclusive;

pub const FEED_PAGE_KEY_PREFIX: &str = "feed_page_";

/// Key of one page of the published-posts feed. Pages are 1-indexed.
pub fn feed_page_key(page: u32) -> String {
    format!("{FEED_PAGE_KEY_PREFIX}{page}")
}

/// Pages dropped after a content write. The range is a fixed prefix of the
/// feed; later pages age out through their TTL.
pub fn invalidated_pages(prefix_len: u32) -> RangeInclusive<u32> {
    1..=prefix_len
}
