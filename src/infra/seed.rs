//! Loads a directory of Markdown files as published posts.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::posts::{CreatePostCommand, PostService, PostServiceError};
use crate::application::repos::{AuthorsRepo, RepoError};
use crate::domain::entities::{Actor, AuthorRecord};

const SEED_USERNAME: &str = "agora";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to seed `{path}`: {source}")]
    Post {
        path: PathBuf,
        #[source]
        source: PostServiceError,
    },
}

impl SeedError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Creates one published post per `*.md` file in `dir`, in file-name order,
/// so the last file is the newest post. Returns the number of posts created.
pub async fn seed_from_dir(
    dir: &Path,
    authors: &dyn AuthorsRepo,
    posts: &PostService,
) -> Result<usize, SeedError> {
    let author = authors
        .create_author(AuthorRecord {
            id: Uuid::new_v4(),
            username: SEED_USERNAME.to_string(),
            first_name: "Agora".to_string(),
            last_name: "Seed".to_string(),
            is_admin: true,
        })
        .await?;
    let actor = Actor::from(&author);

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|err| SeedError::io(dir, err))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| SeedError::io(dir, err))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }
    files.sort();

    for path in &files {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| SeedError::io(path, err))?;
        let title = title_for(path, &source);
        debug!(
            target = "infra::seed",
            path = %path.display(),
            title = %title,
            "Seeding post"
        );

        posts
            .create_post(
                actor,
                CreatePostCommand {
                    title,
                    content: source,
                    summary: None,
                    is_published: true,
                },
            )
            .await
            .map_err(|source| SeedError::Post {
                path: path.clone(),
                source,
            })?;
    }

    info!(
        target = "infra::seed",
        dir = %dir.display(),
        posts = files.len(),
        "Seeded posts from directory"
    );
    Ok(files.len())
}

/// First level-one heading, else the file stem.
fn title_for(path: &Path, source: &str) -> String {
    source
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_first_heading() {
        let title = title_for(Path::new("posts/a.md"), "intro\n# Real Title\n\n# Other\n");
        assert_eq!(title, "Real Title");
    }

    #[test]
    fn title_falls_back_to_file_stem() {
        let title = title_for(Path::new("posts/hello-world.md"), "no heading here");
        assert_eq!(title, "hello-world");
    }
}
