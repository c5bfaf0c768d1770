use std::collections::{HashMap, HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

/// Value written to `rel` on every anchor that survives sanitization.
pub(crate) const LINK_REL: &str = "nofollow";

const URL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

pub(crate) const POST_TAGS: [&str; 19] = [
    "a",
    "abbr",
    "acronym",
    "b",
    "blockquote",
    "code",
    "em",
    "i",
    "li",
    "ol",
    "pre",
    "strong",
    "ul",
    "h1",
    "h2",
    "h3",
    "p",
    "br",
    "img",
];

pub(crate) const COMMENT_TAGS: [&str; 10] =
    ["a", "abbr", "acronym", "b", "code", "em", "i", "strong", "br", "p"];

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_render(&mut options);
    options
}

pub(crate) fn build_post_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = base_builder(&POST_TAGS);
    builder.generic_attributes(HashSet::from(["class"]));
    builder.tag_attributes(HashMap::from([
        ("a", HashSet::from(["href"])),
        ("img", HashSet::from(["src", "alt", "width", "height"])),
    ]));
    builder
}

pub(crate) fn build_comment_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = base_builder(&COMMENT_TAGS);
    builder.generic_attributes(HashSet::new());
    builder.tag_attributes(HashMap::from([("a", HashSet::from(["href"]))]));
    builder
}

// `rel` is not listed in the attribute sets: ammonia owns it through
// `link_rel` and rejects configurations that allow both.
fn base_builder(tags: &[&'static str]) -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    builder.tags(tags.iter().copied().collect());
    // Disallowed tags are unwrapped, including `script` and `style`: their
    // text survives as escaped text.
    builder.clean_content_tags(HashSet::new());
    builder.url_schemes(URL_SCHEMES.iter().copied().collect());
    builder.link_rel(Some(LINK_REL));
    builder.strip_comments(true);

    builder
}

// Autolinking runs after sanitization. Raw HTML passes through so the
// sanitizer sees everything the author wrote.
fn configure_render(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.autolink = false;
    ext.tagfilter = false;
    ext.strikethrough = false;
    ext.table = false;

    let render = &mut options.render;
    render.r#unsafe = true;
    render.hardbreaks = false;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_sanitizer_keeps_allowed_structure() {
        let sanitizer = build_post_sanitizer();
        let html = sanitizer
            .clean("<h2 class=\"intro\">Title</h2><ul><li>one</li></ul>")
            .to_string();

        assert_eq!(html, "<h2 class=\"intro\">Title</h2><ul><li>one</li></ul>");
    }

    #[test]
    fn post_sanitizer_unwraps_disallowed_tags() {
        let sanitizer = build_post_sanitizer();
        let html = sanitizer
            .clean("<h4>Deep</h4><table><tr><td>cell</td></tr></table>")
            .to_string();

        assert!(!html.contains("<h4"));
        assert!(!html.contains("<table"));
        assert!(html.contains("Deep"));
        assert!(html.contains("cell"));
    }

    #[test]
    fn post_sanitizer_filters_image_attributes() {
        let sanitizer = build_post_sanitizer();
        let html = sanitizer
            .clean("<img src=\"https://example.com/a.png\" alt=\"a\" onerror=\"x()\" loading=\"lazy\">")
            .to_string();

        assert!(html.contains("src=\"https://example.com/a.png\""));
        assert!(html.contains("alt=\"a\""));
        assert!(!html.contains("onerror"));
        assert!(!html.contains("loading"));
    }

    #[test]
    fn comment_sanitizer_drops_block_elements_and_classes() {
        let sanitizer = build_comment_sanitizer();
        let html = sanitizer
            .clean("<blockquote class=\"q\"><p class=\"x\">quoted</p></blockquote><img src=\"https://example.com/a.png\">")
            .to_string();

        assert_eq!(html, "<p>quoted</p>");
    }

    #[test]
    fn sanitizers_rewrite_rel_and_reject_script_urls() {
        let sanitizer = build_comment_sanitizer();
        let html = sanitizer
            .clean("<a href=\"javascript:alert(1)\" rel=\"me\">x</a><a href=\"https://example.com\" target=\"_blank\">y</a>")
            .to_string();

        assert!(!html.contains("javascript:"));
        assert!(!html.contains("target="));
        assert!(!html.contains("rel=\"me\""));
        assert!(html.contains("<a href=\"https://example.com\" rel=\"nofollow\">y</a>"));
    }

    #[test]
    fn script_and_style_are_unwrapped_keeping_text() {
        let sanitizer = build_post_sanitizer();
        let html = sanitizer
            .clean("<script>alert(1)</script><style>p{}</style>hello")
            .to_string();

        assert_eq!(html, "alert(1)p{}hello");
    }

    #[test]
    fn script_markup_inside_kept_text_is_escaped() {
        let sanitizer = build_comment_sanitizer();
        let html = sanitizer
            .clean("<p>x <script>if (a < b) { go() }</script> y</p>")
            .to_string();

        assert!(!html.contains("<script"));
        assert_eq!(html, "<p>x if (a &lt; b) { go() } y</p>");
    }
}
