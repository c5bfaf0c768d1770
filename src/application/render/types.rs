use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Selects the allow-list applied to rendered content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderProfile {
    /// Long-form post bodies: headings, lists, code blocks and images.
    Post,
    /// Comments: inline formatting and links only.
    Comment,
}

impl RenderProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderProfile::Post => "post",
            RenderProfile::Comment => "comment",
        }
    }
}

/// Failures inside the rendering pipeline. They never reach callers of
/// [`RenderService::render`]; the pipeline degrades to escaped text instead.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("autolinking failed: {message}")]
    Linkify { message: String },
    #[error("render pipeline panicked: {message}")]
    Panicked { message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same source and profile they return identical HTML.
pub trait RenderService: Send + Sync {
    fn render(&self, source: &str, profile: RenderProfile) -> String;
}
