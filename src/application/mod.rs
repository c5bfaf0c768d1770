//! Application services: rendering, the feed read path and the write paths.

pub mod comments;
pub mod error;
pub mod feed;
pub mod pagination;
pub mod posts;
pub mod render;
pub mod repos;
