use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{comments::CommentServiceError, feed::FeedError, posts::PostServiceError},
    config::LoadError,
    domain::error::DomainError,
    infra::{error::InfraError, seed::SeedError},
};

/// Error chain captured for logging: the error itself followed by each source.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Post(#[from] PostServiceError),
    #[error(transparent)]
    Comment(#[from] CommentServiceError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code reported by the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 78,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Post(PostServiceError::Domain(DomainError::Validation { .. }))
            | AppError::Comment(CommentServiceError::Domain(DomainError::Validation { .. })) => 65,
            AppError::Infra(InfraError::Io(_)) | AppError::Seed(SeedError::Io { .. }) => 74,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_walks_source_chain() {
        let io = std::io::Error::other("disk gone");
        let error = AppError::from(InfraError::from(io));
        let report = ErrorReport::from_error("test", &error);
        assert_eq!(report.messages[0], "io error: disk gone");
        assert_eq!(report.messages.last().map(String::as_str), Some("disk gone"));
    }

    #[test]
    fn exit_codes_follow_error_class() {
        let invalid = AppError::from(PostServiceError::from(DomainError::validation("bad")));
        assert_eq!(invalid.exit_code(), 65);

        let config = AppError::from(LoadError::Invalid {
            key: "feed.posts_per_page",
            reason: "must be greater than zero".to_string(),
        });
        assert_eq!(config.exit_code(), 78);

        let io = AppError::from(InfraError::from(std::io::Error::other("closed")));
        assert_eq!(io.exit_code(), 74);

        assert_eq!(AppError::unexpected("boom").exit_code(), 1);
    }
}
