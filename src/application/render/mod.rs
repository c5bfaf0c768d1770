//! Markdown rendering for posts and comments.
//!
//! The pipeline is pure: it accepts author-supplied markdown and produces
//! sanitized HTML. Persisting the result happens in the caller, which invokes
//! the renderer explicitly before every insert or update.

mod service;
mod types;

pub use service::{ComrakRenderService, render_service};
pub use types::{RenderError, RenderProfile, RenderService};

pub(crate) use service::METRIC_RENDER_FALLBACK_TOTAL;
