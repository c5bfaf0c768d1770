//! Post write path: validate, render, persist, then invalidate the feed.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::render::{RenderProfile, RenderService};
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::cache::FeedCache;
use crate::config::ContentSettings;
use crate::domain::entities::{Actor, PostRecord};
use crate::domain::error::DomainError;

const SUMMARY_CHARS: usize = 200;
const SUMMARY_ELLIPSIS: &str = "...";

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct UpdatePostCommand {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    renderer: Arc<dyn RenderService>,
    cache: FeedCache,
    limits: ContentSettings,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        renderer: Arc<dyn RenderService>,
        cache: FeedCache,
        limits: ContentSettings,
    ) -> Self {
        Self {
            reader,
            writer,
            renderer,
            cache,
            limits,
        }
    }

    pub async fn create_post(
        &self,
        author: Actor,
        command: CreatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        self.validate(&command.title, &command.content)?;

        let summary = derive_summary(command.summary.as_deref(), &command.content);
        let content_html = self.renderer.render(&command.content, RenderProfile::Post);

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                title: command.title,
                content: command.content,
                content_html,
                summary,
                is_published: command.is_published,
            })
            .await?;

        self.after_write("post.create", post.id);
        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor: Actor,
        command: UpdatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        let existing = self.load(command.id).await?;
        if !actor.can_modify(&existing) {
            return Err(
                DomainError::forbidden("only the author or an admin may edit a post").into(),
            );
        }
        self.validate(&command.title, &command.content)?;

        let summary = derive_summary(command.summary.as_deref(), &command.content);
        let content_html = self.renderer.render(&command.content, RenderProfile::Post);

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id: command.id,
                title: command.title,
                content: command.content,
                content_html,
                summary,
            })
            .await?;

        self.after_write("post.update", post.id);
        Ok(post)
    }

    /// Flips the published flag. Administrators only.
    pub async fn toggle_status(
        &self,
        actor: Actor,
        id: Uuid,
    ) -> Result<PostRecord, PostServiceError> {
        if !actor.is_admin {
            return Err(DomainError::forbidden("only an admin may change post status").into());
        }
        let existing = self.load(id).await?;
        let post = self
            .writer
            .set_published(id, !existing.is_published)
            .await?;

        self.after_write("post.toggle_status", post.id);
        Ok(post)
    }

    /// Removes the post and its comments.
    pub async fn delete_post(&self, actor: Actor, id: Uuid) -> Result<(), PostServiceError> {
        let existing = self.load(id).await?;
        if !actor.can_modify(&existing) {
            return Err(
                DomainError::forbidden("only the author or an admin may delete a post").into(),
            );
        }
        self.writer.delete_post(id).await?;

        self.after_write("post.delete", id);
        Ok(())
    }

    /// Counts one view. The feed shows view counts but is not invalidated
    /// here; cached pages catch up when they expire.
    pub async fn record_view(&self, id: Uuid) -> Result<u64, PostServiceError> {
        match self.writer.increment_views(id).await {
            Ok(count) => Ok(count),
            Err(RepoError::NotFound) => Err(DomainError::not_found("post").into()),
            Err(err) => Err(err.into()),
        }
    }

    async fn load(&self, id: Uuid) -> Result<PostRecord, PostServiceError> {
        self.reader
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post").into())
    }

    fn validate(&self, title: &str, content: &str) -> Result<(), DomainError> {
        ensure_non_empty(title, "title")?;
        ensure_non_empty(content, "content")?;
        ensure_max_chars(title, "title", self.limits.max_title_length.get())?;
        ensure_max_chars(content, "content", self.limits.max_post_length.get())?;
        Ok(())
    }

    fn after_write(&self, action: &'static str, id: Uuid) {
        let invalidated = self.cache.invalidate_feed();
        info!(
            target = "application::posts",
            action,
            post_id = %id,
            feed_invalidated = invalidated,
            "Post write committed"
        );
    }
}

pub(crate) fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn ensure_max_chars(
    value: &str,
    field: &'static str,
    max: usize,
) -> Result<(), DomainError> {
    let length = value.chars().count();
    if length > max {
        return Err(DomainError::validation(format!(
            "{field} is {length} characters; the limit is {max}"
        )));
    }
    Ok(())
}

/// The author's summary when given, else the head of the content.
pub fn derive_summary(provided: Option<&str>, content: &str) -> String {
    if let Some(summary) = provided.map(str::trim).filter(|summary| !summary.is_empty()) {
        return summary.to_string();
    }

    let mut chars = content.char_indices();
    match chars.nth(SUMMARY_CHARS) {
        Some((cut, _)) => format!("{}{SUMMARY_ELLIPSIS}", &content[..cut]),
        None => content.to_string(),
    }
}
