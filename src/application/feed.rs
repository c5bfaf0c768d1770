//! Public feed read path.
//!
//! Pages are served cache-aside: a hit returns the stored payload, a miss
//! rebuilds the page from the repositories and stores it for the configured
//! TTL. A failing cache only costs the rebuild.

use std::{num::NonZeroU32, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::pagination::{PageMeta, PageRequest};
use crate::application::repos::{AuthorsRepo, CommentsRepo, PostsRepo, RepoError};
use crate::cache::{FeedCache, feed_page_key};
use crate::domain::entities::PostRecord;

const FEED_TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// One published post as shown in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub title: String,
    pub content_html: String,
    pub summary: String,
    pub author: String,
    pub author_username: String,
    pub created_at: String,
    pub view_count: u64,
    pub comment_count: u64,
}

/// Cached payload for `feed_page_{n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub page: u32,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_num: Option<u32>,
    pub prev_num: Option<u32>,
}

impl FeedPage {
    fn new(items: Vec<FeedItem>, meta: PageMeta) -> Self {
        Self {
            items,
            page: meta.page,
            pages: meta.pages,
            has_next: meta.has_next,
            has_prev: meta.has_prev,
            next_num: meta.next_num,
            prev_num: meta.prev_num,
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    authors: Arc<dyn AuthorsRepo>,
    cache: FeedCache,
    posts_per_page: NonZeroU32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        authors: Arc<dyn AuthorsRepo>,
        cache: FeedCache,
        posts_per_page: NonZeroU32,
    ) -> Self {
        Self {
            posts,
            comments,
            authors,
            cache,
            posts_per_page,
        }
    }

    /// Page `page` of the published feed, newest first. Pages below 1 are
    /// served as page 1; pages past the end are empty.
    #[instrument(level = "debug", skip(self))]
    pub async fn page(&self, page: u32) -> Result<FeedPage, FeedError> {
        let request = PageRequest::new(page, self.posts_per_page);
        let key = feed_page_key(request.page());

        if let Some(cached) = self.cache.get::<FeedPage>(&key) {
            debug!(
                target = "application::feed",
                key = %key,
                "Serving feed page from cache"
            );
            return Ok(cached);
        }

        let feed_page = self.build_page(request).await?;
        self.cache.set(&key, &feed_page, self.cache.ttl());
        Ok(feed_page)
    }

    async fn build_page(&self, request: PageRequest) -> Result<FeedPage, FeedError> {
        let listing = self.posts.list_published(request).await?;
        let meta = listing.meta();

        let mut items = Vec::with_capacity(listing.items.len());
        for post in listing.items {
            items.push(self.build_item(post).await?);
        }

        Ok(FeedPage::new(items, meta))
    }

    async fn build_item(&self, post: PostRecord) -> Result<FeedItem, FeedError> {
        let author = self
            .authors
            .find_by_id(post.author_id)
            .await?
            .ok_or_else(|| {
                RepoError::integrity(format!(
                    "post `{}` references missing author `{}`",
                    post.id, post.author_id
                ))
            })?;
        let comment_count = self.comments.count_approved(post.id).await?;
        let created_at = post.created_at.format(FEED_TIMESTAMP_FORMAT)?;

        Ok(FeedItem {
            id: post.id,
            title: post.title,
            content_html: post.content_html,
            summary: post.summary,
            author: author.full_name(),
            author_username: author.username,
            created_at,
            view_count: post.view_count,
            comment_count,
        })
    }
}
