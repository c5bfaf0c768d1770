//! In-process repository implementations.
//!
//! Backs the CLI and the test suites. All state lives behind one async lock,
//! so each repository call observes a consistent snapshot.

mod authors;
mod comments;
mod posts;

use std::{cmp::Reverse, collections::HashMap, sync::Arc};

use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::{AuthorRecord, CommentRecord, PostRecord};

#[derive(Clone, Default)]
pub struct InMemoryRepositories {
    state: Arc<RwLock<State>>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored posts, published or not.
    pub async fn post_count(&self) -> usize {
        self.state.read().await.posts.len()
    }

    /// Number of stored comments, approved or not.
    pub async fn comment_count(&self) -> usize {
        self.state.read().await.comments.len()
    }
}

#[derive(Default)]
struct State {
    next_seq: u64,
    posts: HashMap<Uuid, Stored<PostRecord>>,
    comments: HashMap<Uuid, Stored<CommentRecord>>,
    authors: HashMap<Uuid, AuthorRecord>,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Insertion sequence breaks ties between records sharing a timestamp.
struct Stored<T> {
    seq: u64,
    record: T,
}

/// Sort key placing the newest record first.
fn newest_first<T>(
    stored: &Stored<T>,
    created_at: OffsetDateTime,
) -> Reverse<(OffsetDateTime, u64)> {
    Reverse((created_at, stored.seq))
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::application::pagination::PageRequest;
    use crate::application::repos::{
        AuthorsRepo, CommentsRepo, CreateCommentParams, CreatePostParams, PostsRepo,
        PostsWriteRepo, RepoError,
    };

    fn author() -> AuthorRecord {
        AuthorRecord {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_admin: false,
        }
    }

    fn post_params(author_id: Uuid, title: &str, is_published: bool) -> CreatePostParams {
        CreatePostParams {
            author_id,
            title: title.to_string(),
            content: "body".to_string(),
            content_html: "<p>body</p>".to_string(),
            summary: "body".to_string(),
            is_published,
        }
    }

    fn first_page(per_page: u32) -> PageRequest {
        PageRequest::new(1, NonZeroU32::new(per_page).expect("non-zero"))
    }

    #[tokio::test]
    async fn published_posts_are_listed_newest_first() {
        let repos = InMemoryRepositories::new();
        let author = repos.create_author(author()).await.expect("author");

        for title in ["first", "second", "third"] {
            repos
                .create_post(post_params(author.id, title, true))
                .await
                .expect("post");
        }
        repos
            .create_post(post_params(author.id, "draft", false))
            .await
            .expect("draft");

        let page = repos.list_published(first_page(10)).await.expect("list");
        let titles: Vec<_> = page.items.iter().map(|post| post.title.as_str()).collect();
        assert_eq!(titles, ["third", "second", "first"]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn posts_require_existing_author() {
        let repos = InMemoryRepositories::new();
        let err = repos
            .create_post(post_params(Uuid::new_v4(), "orphan", true))
            .await
            .expect_err("missing author");
        assert!(matches!(err, RepoError::Integrity { .. }));
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let repos = InMemoryRepositories::new();
        repos.create_author(author()).await.expect("author");
        let err = repos.create_author(author()).await.expect_err("duplicate");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn deleting_post_removes_its_comments() {
        let repos = InMemoryRepositories::new();
        let author = repos.create_author(author()).await.expect("author");
        let post = repos
            .create_post(post_params(author.id, "post", true))
            .await
            .expect("post");
        repos
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                content: "hi".to_string(),
                content_html: "<p>hi</p>".to_string(),
                is_approved: true,
            })
            .await
            .expect("comment");
        assert_eq!(repos.comment_count().await, 1);

        repos.delete_post(post.id).await.expect("delete");

        assert_eq!(repos.post_count().await, 0);
        assert_eq!(repos.comment_count().await, 0);
        assert!(matches!(
            repos.delete_post(post.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn approved_comment_counts_ignore_pending_comments() {
        let repos = InMemoryRepositories::new();
        let author = repos.create_author(author()).await.expect("author");
        let post = repos
            .create_post(post_params(author.id, "post", true))
            .await
            .expect("post");

        for is_approved in [true, false, true] {
            repos
                .create_comment(CreateCommentParams {
                    post_id: post.id,
                    author_id: author.id,
                    content: "c".to_string(),
                    content_html: "<p>c</p>".to_string(),
                    is_approved,
                })
                .await
                .expect("comment");
        }

        assert_eq!(repos.count_approved(post.id).await.expect("count"), 2);
        let page = repos
            .list_approved(post.id, first_page(20))
            .await
            .expect("list");
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn views_increment() {
        let repos = InMemoryRepositories::new();
        let author = repos.create_author(author()).await.expect("author");
        let post = repos
            .create_post(post_params(author.id, "post", true))
            .await
            .expect("post");

        assert_eq!(repos.increment_views(post.id).await.expect("view"), 1);
        assert_eq!(repos.increment_views(post.id).await.expect("view"), 2);
        let stored = PostsRepo::find_by_id(&repos, post.id)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(stored.view_count, 2);
    }
}
