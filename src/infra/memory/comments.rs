use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{NumberedPage, PageRequest};
use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::{InMemoryRepositories, Stored, newest_first};

#[async_trait]
impl CommentsRepo for InMemoryRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let CreateCommentParams {
            post_id,
            author_id,
            content,
            content_html,
            is_approved,
        } = params;

        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Err(RepoError::integrity(format!(
                "post `{post_id}` does not exist"
            )));
        }

        let record = CommentRecord {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content,
            content_html,
            is_approved,
            created_at: OffsetDateTime::now_utc(),
        };

        let seq = state.next_seq();
        state.comments.insert(
            record.id,
            Stored {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self
            .state
            .read()
            .await
            .comments
            .get(&id)
            .map(|stored| stored.record.clone()))
    }

    async fn set_approved(&self, id: Uuid, is_approved: bool) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.write().await;
        let stored = state.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        stored.record.is_approved = is_approved;
        Ok(stored.record.clone())
    }

    async fn list_approved(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<NumberedPage<CommentRecord>, RepoError> {
        let state = self.state.read().await;
        let mut approved: Vec<&Stored<CommentRecord>> = state
            .comments
            .values()
            .filter(|stored| stored.record.post_id == post_id && stored.record.is_approved)
            .collect();
        approved.sort_by_key(|stored| newest_first(stored, stored.record.created_at));

        let records = approved
            .into_iter()
            .map(|stored| stored.record.clone())
            .collect();
        Ok(NumberedPage::from_sorted(records, page))
    }

    async fn count_approved(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        let count = state
            .comments
            .values()
            .filter(|stored| stored.record.post_id == post_id && stored.record.is_approved)
            .count();
        Ok(count as u64)
    }
}
