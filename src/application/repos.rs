//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{NumberedPage, PageRequest};
use crate::domain::entities::{AuthorRecord, CommentRecord, PostRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub summary: String,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub content_html: String,
    pub is_approved: bool,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Published posts, newest first.
    async fn list_published(
        &self,
        page: PageRequest,
    ) -> Result<NumberedPage<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Replaces the editable fields and bumps `updated_at`.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn set_published(&self, id: Uuid, is_published: bool) -> Result<PostRecord, RepoError>;

    /// Deletes the post together with its comments.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;

    /// Returns the new view count.
    async fn increment_views(&self, id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    async fn set_approved(&self, id: Uuid, is_approved: bool) -> Result<CommentRecord, RepoError>;

    /// Approved comments of one post, newest first.
    async fn list_approved(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<NumberedPage<CommentRecord>, RepoError>;

    async fn count_approved(&self, post_id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError>;

    async fn create_author(&self, author: AuthorRecord) -> Result<AuthorRecord, RepoError>;
}
