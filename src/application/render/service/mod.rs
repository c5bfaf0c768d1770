mod config;
mod linkify;

use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use comrak::{Arena, format_html, parse_document};
use metrics::counter;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::application::render::types::{RenderError, RenderProfile, RenderService};

use config::{build_comment_sanitizer, build_post_sanitizer, default_options};
use linkify::linkify;

pub(crate) const METRIC_RENDER_FALLBACK_TOTAL: &str = "agora_render_fallback_total";

/// Default rendering pipeline: Comrak for markdown, Ammonia for sanitisation
/// and a lol_html pass that autolinks bare URLs in the sanitized output.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    post_sanitizer: ammonia::Builder<'static>,
    comment_sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            post_sanitizer: build_post_sanitizer(),
            comment_sanitizer: build_comment_sanitizer(),
        }
    }

    /// Render markdown into HTML while skipping sanitisation and autolinking.
    /// Intended for diagnostics when refining sanitizer rules; the output is
    /// untrusted.
    pub fn render_unsanitized(&self, source: &str) -> Result<String, RenderError> {
        render_html_stage(source, &self.options)
    }

    fn render_checked(&self, source: &str, profile: RenderProfile) -> Result<String, RenderError> {
        let rendered_html = render_html_stage(source, &self.options)?;
        let sanitized_html = sanitize_stage(&rendered_html, self.sanitizer(profile));
        linkify_stage(&sanitized_html)
    }

    fn sanitizer(&self, profile: RenderProfile) -> &ammonia::Builder<'static> {
        match profile {
            RenderProfile::Post => &self.post_sanitizer,
            RenderProfile::Comment => &self.comment_sanitizer,
        }
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, source: &str, profile: RenderProfile) -> String {
        render_guarded(source, profile, |source| self.render_checked(source, profile))
    }
}

/// Runs `pipeline` and turns an error or a panic into escaped plain text.
fn render_guarded<F>(source: &str, profile: RenderProfile, pipeline: F) -> String
where
    F: FnOnce(&str) -> Result<String, RenderError>,
{
    let outcome = catch_unwind(AssertUnwindSafe(|| pipeline(source))).unwrap_or_else(|payload| {
        Err(RenderError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    });

    match outcome {
        Ok(html) => html,
        Err(error) => {
            warn!(
                target = "application::render",
                profile = profile.as_str(),
                source_len = source.len(),
                error = %error,
                "Render pipeline failed; falling back to escaped text"
            );
            counter!(METRIC_RENDER_FALLBACK_TOTAL, "profile" => profile.as_str()).increment(1);
            fallback_html(source)
        }
    }
}

fn render_html_stage(source: &str, options: &comrak::Options<'static>) -> Result<String, RenderError> {
    let arena = Arena::new();
    let root = parse_document(&arena, source, options);

    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

fn sanitize_stage(html: &str, sanitizer: &ammonia::Builder<'static>) -> String {
    sanitizer.clean(html).to_string()
}

fn linkify_stage(html: &str) -> Result<String, RenderError> {
    linkify(html)
}

/// Plain-text rendition used when the pipeline cannot produce markup.
fn fallback_html(source: &str) -> String {
    format!("<p>{}</p>", ammonia::clean_text(source))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    use super::*;

    fn render(source: &str, profile: RenderProfile) -> String {
        ComrakRenderService::new().render(source, profile)
    }

    #[test]
    fn renders_block_markup_for_posts() {
        let html = render(
            "# Title\n\nSome *emphasis* and **strong** text.\n\n- one\n- two\n\n> quoted\n",
            RenderProfile::Post,
        );

        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains("<strong>strong</strong>"));
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>one</li>"));
        assert!(html.contains("<blockquote>"));
    }

    #[test]
    fn fenced_code_keeps_language_class_for_posts() {
        let html = render("```rust\nfn main() {}\n```\n", RenderProfile::Post);
        assert!(html.contains("<pre><code class=\"language-rust\">fn main() {}"));
    }

    #[test]
    fn deep_headings_are_flattened_to_text() {
        let html = render("#### Deep heading\n", RenderProfile::Post);
        assert!(!html.contains("<h4"));
        assert!(html.contains("Deep heading"));
    }

    #[test]
    fn comment_profile_drops_headings_lists_and_images() {
        let html = render(
            "## Heading\n\n- item\n\n![alt](https://example.com/a.png)\n",
            RenderProfile::Comment,
        );

        assert!(!html.contains("<h2"));
        assert!(!html.contains("<ul"));
        assert!(!html.contains("<li"));
        assert!(!html.contains("<img"));
        assert!(html.contains("Heading"));
        assert!(html.contains("item"));
    }

    #[test]
    fn post_profile_keeps_images() {
        let html = render("![diagram](https://example.com/a.png)\n", RenderProfile::Post);
        assert!(html.contains("<img src=\"https://example.com/a.png\" alt=\"diagram\">"));
    }

    #[test]
    fn markdown_links_are_sanitized() {
        let html = render(
            "[safe](https://example.com) [unsafe](javascript:alert(1))\n",
            RenderProfile::Comment,
        );

        assert!(html.contains("<a href=\"https://example.com\" rel=\"nofollow\">safe</a>"));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn script_tags_are_removed_and_text_retained() {
        let html = render("<script>alert(1)</script>hello", RenderProfile::Post);
        assert!(!html.contains("<script"));
        assert_eq!(html.trim_end(), "alert(1)hello");
    }

    #[test]
    fn render_is_deterministic() {
        let source = "Some text with https://example.com and `code`\n\n1. first\n2. second\n";
        let first = render(source, RenderProfile::Post);
        let second = render(source, RenderProfile::Post);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_renders_empty_fragment() {
        assert_eq!(render("", RenderProfile::Post), "");
    }

    fn fallback_count(recorder: &DebuggingRecorder, run: impl FnOnce()) -> u64 {
        let snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(recorder, run);
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == METRIC_RENDER_FALLBACK_TOTAL)
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(count) => count,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn failing_pipeline_falls_back_to_escaped_text() {
        let recorder = DebuggingRecorder::new();
        let mut html = String::new();

        let count = fallback_count(&recorder, || {
            html = render_guarded("<b>bold</b> & more", RenderProfile::Comment, |_| {
                Err(RenderError::Linkify {
                    message: "rewriter rejected input".to_string(),
                })
            });
        });

        assert!(html.starts_with("<p>&lt;b&gt;bold"), "{html}");
        assert!(html.ends_with("</p>"));
        assert!(!html.contains("<b>"));
        assert_eq!(count, 1);
    }

    #[test]
    fn panicking_pipeline_falls_back_to_escaped_text() {
        let recorder = DebuggingRecorder::new();
        let mut html = String::new();

        let count = fallback_count(&recorder, || {
            html = render_guarded("<i>x</i>", RenderProfile::Post, |_| {
                panic!("markdown stage exploded")
            });
        });

        assert!(html.starts_with("<p>&lt;i&gt;x"), "{html}");
        assert!(!html.contains("<i>"));
        assert_eq!(count, 1);
    }

    #[test]
    fn successful_pipeline_does_not_count_fallbacks() {
        let recorder = DebuggingRecorder::new();
        let mut html = String::new();

        let count = fallback_count(&recorder, || {
            html = ComrakRenderService::new().render("*ok*", RenderProfile::Post);
        });

        assert_eq!(html.trim_end(), "<p><em>ok</em></p>");
        assert_eq!(count, 0);
    }

    #[test]
    fn fallback_escapes_markup() {
        let html = fallback_html("<b>bold</b>");
        assert!(html.starts_with("<p>"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn unsanitized_render_keeps_raw_html() {
        let html = ComrakRenderService::new()
            .render_unsanitized("<script>x()</script>\n")
            .expect("render");
        assert!(html.contains("<script>"));
    }
}
