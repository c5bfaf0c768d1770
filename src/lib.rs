//! Agora content pipeline: sanitized Markdown rendering for posts and
//! comments, and a cache-aside public feed.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
