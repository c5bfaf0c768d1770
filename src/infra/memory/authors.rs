use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{AuthorsRepo, RepoError};
use crate::domain::entities::AuthorRecord;

use super::InMemoryRepositories;

#[async_trait]
impl AuthorsRepo for InMemoryRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError> {
        Ok(self.state.read().await.authors.get(&id).cloned())
    }

    async fn create_author(&self, author: AuthorRecord) -> Result<AuthorRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .authors
            .values()
            .any(|existing| existing.username == author.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "authors_username_key".to_string(),
            });
        }
        state.authors.insert(author.id, author.clone());
        Ok(author)
    }
}
