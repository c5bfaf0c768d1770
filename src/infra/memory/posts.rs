use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{NumberedPage, PageRequest};
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::{InMemoryRepositories, Stored, newest_first};

#[async_trait]
impl PostsRepo for InMemoryRepositories {
    async fn list_published(
        &self,
        page: PageRequest,
    ) -> Result<NumberedPage<PostRecord>, RepoError> {
        let state = self.state.read().await;
        let mut published: Vec<&Stored<PostRecord>> = state
            .posts
            .values()
            .filter(|stored| stored.record.is_published)
            .collect();
        published.sort_by_key(|stored| newest_first(stored, stored.record.created_at));

        let records = published
            .into_iter()
            .map(|stored| stored.record.clone())
            .collect();
        Ok(NumberedPage::from_sorted(records, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .state
            .read()
            .await
            .posts
            .get(&id)
            .map(|stored| stored.record.clone()))
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            author_id,
            title,
            content,
            content_html,
            summary,
            is_published,
        } = params;

        let mut state = self.state.write().await;
        if !state.authors.contains_key(&author_id) {
            return Err(RepoError::integrity(format!(
                "author `{author_id}` does not exist"
            )));
        }

        let now = OffsetDateTime::now_utc();
        let record = PostRecord {
            id: Uuid::new_v4(),
            author_id,
            title,
            content,
            content_html,
            summary,
            is_published,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };

        let seq = state.next_seq();
        state.posts.insert(
            record.id,
            Stored {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            content,
            content_html,
            summary,
        } = params;

        let mut state = self.state.write().await;
        let stored = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        let record = &mut stored.record;
        record.title = title;
        record.content = content;
        record.content_html = content_html;
        record.summary = summary;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn set_published(&self, id: Uuid, is_published: bool) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        let stored = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        stored.record.is_published = is_published;
        Ok(stored.record.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state.posts.remove(&id).ok_or(RepoError::NotFound)?;
        state
            .comments
            .retain(|_, stored| stored.record.post_id != id);
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let stored = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        stored.record.view_count = stored.record.view_count.saturating_add(1);
        Ok(stored.record.view_count)
    }
}
