//! Domain entities mirrored from persistent storage.
//!
//! Records are plain data. `content_html` is written by the services that own
//! the write path, never as a side effect of constructing a record.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRecord {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

impl AuthorRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub summary: String,
    pub is_published: bool,
    pub view_count: u64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub content_html: String,
    pub is_approved: bool,
    pub created_at: OffsetDateTime,
}

/// Identity of whoever triggers a write. Authentication happens upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(id: Uuid) -> Self {
        Self {
            id,
            is_admin: false,
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self { id, is_admin: true }
    }

    /// Owners and administrators may edit or delete a post.
    pub fn can_modify(&self, post: &PostRecord) -> bool {
        self.is_admin || post.author_id == self.id
    }
}

impl From<&AuthorRecord> for Actor {
    fn from(author: &AuthorRecord) -> Self {
        Self {
            id: author.id,
            is_admin: author.is_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post(author_id: Uuid) -> PostRecord {
        let now = OffsetDateTime::now_utc();
        PostRecord {
            id: Uuid::new_v4(),
            author_id,
            title: "Hello".to_string(),
            content: "body".to_string(),
            content_html: "<p>body</p>".to_string(),
            summary: "body".to_string(),
            is_published: true,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn owner_and_admin_can_modify() {
        let owner = Uuid::new_v4();
        let post = sample_post(owner);

        assert!(Actor::user(owner).can_modify(&post));
        assert!(Actor::admin(Uuid::new_v4()).can_modify(&post));
        assert!(!Actor::user(Uuid::new_v4()).can_modify(&post));
    }

    #[test]
    fn full_name_joins_first_and_last() {
        let author = AuthorRecord {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_admin: false,
        };
        assert_eq!(author.full_name(), "Ada Lovelace");
    }
}
