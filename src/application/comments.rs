//! Comment write path and the approved-comment listing.

use std::{num::NonZeroU32, sync::Arc};

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::pagination::{NumberedPage, PageRequest};
use crate::application::posts::{ensure_max_chars, ensure_non_empty};
use crate::application::render::{RenderProfile, RenderService};
use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::cache::FeedCache;
use crate::domain::entities::{Actor, CommentRecord};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum CommentServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    renderer: Arc<dyn RenderService>,
    cache: FeedCache,
    max_length: usize,
    per_page: NonZeroU32,
}

impl CommentService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        renderer: Arc<dyn RenderService>,
        cache: FeedCache,
        max_length: usize,
        per_page: NonZeroU32,
    ) -> Self {
        Self {
            posts,
            comments,
            renderer,
            cache,
            max_length,
            per_page,
        }
    }

    /// New comments start approved, matching the feed's comment counts.
    pub async fn add_comment(
        &self,
        author: Actor,
        post_id: Uuid,
        content: String,
    ) -> Result<CommentRecord, CommentServiceError> {
        ensure_non_empty(&content, "content")?;
        ensure_max_chars(&content, "content", self.max_length)?;

        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::not_found("post").into());
        }

        let content_html = self.renderer.render(&content, RenderProfile::Comment);
        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: author.id,
                content,
                content_html,
                is_approved: true,
            })
            .await?;

        self.after_write("comment.create", comment.id);
        Ok(comment)
    }

    /// Flips the approval flag. Administrators only.
    pub async fn toggle_approval(
        &self,
        actor: Actor,
        id: Uuid,
    ) -> Result<CommentRecord, CommentServiceError> {
        if !actor.is_admin {
            return Err(DomainError::forbidden("only an admin may moderate comments").into());
        }
        let existing = self
            .comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment"))?;
        let comment = self
            .comments
            .set_approved(id, !existing.is_approved)
            .await?;

        self.after_write("comment.toggle_approval", comment.id);
        Ok(comment)
    }

    /// Approved comments of a post, newest first.
    pub async fn list_approved(
        &self,
        post_id: Uuid,
        page: u32,
    ) -> Result<NumberedPage<CommentRecord>, CommentServiceError> {
        let request = PageRequest::new(page, self.per_page);
        Ok(self.comments.list_approved(post_id, request).await?)
    }

    fn after_write(&self, action: &'static str, id: Uuid) {
        let invalidated = self.cache.invalidate_feed();
        info!(
            target = "application::comments",
            action,
            comment_id = %id,
            feed_invalidated = invalidated,
            "Comment write committed"
        );
    }
}
