use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use lol_html::{
    EndTagHandler, RewriteStrSettings, doc_text, element,
    html_content::{ContentType, EndTag},
    rewrite_str,
};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::application::render::types::RenderError;

use super::config::LINK_REL;

/// Elements whose text is never turned into links.
const SKIP_SELECTOR: &str = "a, pre, code";

/// Escaped sequences that end a candidate URL. Sanitized text never carries a
/// raw `<`, `>` or non-breaking space.
const URL_TERMINATORS: [&str; 3] = ["&lt;", "&gt;", "&nbsp;"];

/// Top-level domains recognised on hosts written without a scheme or `www.`.
const BARE_DOMAIN_TLDS: &str = "com|org|net|edu|gov|int|io|dev|app|info|biz|co|me|uk|de|fr|eu";

static LINKABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)(?P<url>\b(?:https?://|www\.)[^\s<>"']+)|(?P<email>\b[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{{2,}}\b)|(?P<domain>\b(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+(?:{BARE_DOMAIN_TLDS})\b(?:/[^\s<>"']*)?)"#
    ))
    .expect("linkable pattern is valid")
});

/// Wrap bare URLs, hosts and email addresses found in sanitized HTML text
/// with anchors. Runs after sanitization, so the anchors it emits must only use
/// attributes every profile allows (`href`, `rel`).
pub(crate) fn linkify(html: &str) -> Result<String, RenderError> {
    let skip_depth = Rc::new(Cell::new(0usize));
    let pending = Rc::new(RefCell::new(String::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(SKIP_SELECTOR, {
                let skip_depth = Rc::clone(&skip_depth);
                move |el| {
                    if let Some(handlers) = el.end_tag_handlers() {
                        skip_depth.set(skip_depth.get() + 1);
                        let skip_depth = Rc::clone(&skip_depth);
                        let handler: EndTagHandler<'static> =
                            Box::new(move |_end: &mut EndTag<'_>| {
                                skip_depth.set(skip_depth.get().saturating_sub(1));
                                Ok(())
                            });
                        handlers.push(handler);
                    }
                    Ok(())
                }
            })],
            document_content_handlers: vec![doc_text!({
                let skip_depth = Rc::clone(&skip_depth);
                let pending = Rc::clone(&pending);
                move |chunk| {
                    if skip_depth.get() > 0 {
                        return Ok(());
                    }

                    let mut buffer = pending.borrow_mut();
                    buffer.push_str(chunk.as_str());
                    if !chunk.last_in_text_node() {
                        chunk.remove();
                        return Ok(());
                    }

                    let text = std::mem::take(&mut *buffer);
                    if let Some(linked) = link_text(&text) {
                        chunk.replace(&linked, ContentType::Html);
                    } else if text != chunk.as_str() {
                        chunk.replace(&text, ContentType::Html);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Linkify {
        message: err.to_string(),
    })
}

/// Returns the rewritten text when at least one link was produced.
fn link_text(text: &str) -> Option<String> {
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut linked = false;

    for captures in LINKABLE.captures_iter(text) {
        let (start, candidate, is_email) = match (
            captures.name("url"),
            captures.name("email"),
            captures.name("domain"),
        ) {
            (Some(url), _, _) => (url.start(), url.as_str(), false),
            (None, Some(email), _) => (email.start(), email.as_str(), true),
            (None, None, Some(domain)) => (domain.start(), domain.as_str(), false),
            (None, None, None) => continue,
        };
        if start < cursor {
            continue;
        }

        let (label, href) = if is_email {
            (candidate, format!("mailto:{candidate}"))
        } else {
            let label = trim_url(candidate);
            match url_href(label) {
                Some(href) => (label, href),
                None => continue,
            }
        };
        if label.is_empty() {
            continue;
        }

        output.push_str(&text[cursor..start]);
        output.push_str(&format!(
            "<a href=\"{href}\" rel=\"{LINK_REL}\">{label}</a>"
        ));
        cursor = start + label.len();
        linked = true;
    }

    if !linked {
        return None;
    }
    output.push_str(&text[cursor..]);
    Some(output)
}

/// Cut a matched URL down to the part that belongs to the link: escaped
/// delimiters end it, and trailing sentence punctuation or an unbalanced
/// closing parenthesis stay in the surrounding text.
fn trim_url(candidate: &str) -> &str {
    let mut end = URL_TERMINATORS
        .iter()
        .filter_map(|needle| candidate.find(needle))
        .min()
        .unwrap_or(candidate.len());

    loop {
        let current = &candidate[..end];
        let Some(last) = current.chars().last() else {
            break;
        };
        let trim = match last {
            '.' | ',' | ':' | '!' | '?' => true,
            ';' => !ends_with_entity(current),
            ')' => current.matches('(').count() < current.matches(')').count(),
            _ => false,
        };
        if !trim {
            break;
        }
        end -= last.len_utf8();
    }

    &candidate[..end]
}

fn ends_with_entity(text: &str) -> bool {
    let Some(amp) = text.rfind('&') else {
        return false;
    };
    let name = &text[amp + 1..text.len() - 1];
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
}

/// Build the `href` for a URL label, or `None` when it does not parse.
/// Labels without a scheme (`www.` hosts, bare domains) get `http://`.
fn url_href(label: &str) -> Option<String> {
    let has_scheme = ["http://", "https://"].iter().any(|scheme| {
        label
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    });
    let href = if has_scheme {
        label.to_string()
    } else {
        format!("http://{label}")
    };

    let decoded = href.replace("&amp;", "&");
    let parsed = Url::parse(&decoded).ok()?;
    parsed.host_str().filter(|host| !host.is_empty())?;
    Some(href)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_bare_url_in_paragraph() {
        let html = linkify("<p>Visit https://example.com now</p>").expect("linkify");
        assert_eq!(
            html,
            "<p>Visit <a href=\"https://example.com\" rel=\"nofollow\">https://example.com</a> now</p>"
        );
    }

    #[test]
    fn leaves_existing_links_alone() {
        let input = "<p><a href=\"https://example.com\" rel=\"nofollow\">https://example.com</a></p>";
        assert_eq!(linkify(input).expect("linkify"), input);
    }

    #[test]
    fn skips_code_and_preformatted_text() {
        let input = "<pre><code>curl https://example.com/api</code></pre><p><code>www.example.com</code></p>";
        assert_eq!(linkify(input).expect("linkify"), input);
    }

    #[test]
    fn links_text_after_a_closed_anchor() {
        let html = linkify("<p><a href=\"/x\" rel=\"nofollow\">x</a> and www.example.org</p>")
            .expect("linkify");
        assert!(html.contains(
            "and <a href=\"http://www.example.org\" rel=\"nofollow\">www.example.org</a>"
        ));
    }

    #[test]
    fn trailing_punctuation_stays_outside() {
        let html = linkify("<p>See https://example.com/docs.</p>").expect("linkify");
        assert!(html.contains(">https://example.com/docs</a>.</p>"));

        let html = linkify("<p>(https://example.com/x)</p>").expect("linkify");
        assert!(html.contains("(<a href=\"https://example.com/x\" rel=\"nofollow\">https://example.com/x</a>)"));
    }

    #[test]
    fn balanced_parentheses_are_kept() {
        let html =
            linkify("<p>https://en.wikipedia.org/wiki/Rust_(language)</p>").expect("linkify");
        assert!(html.contains("href=\"https://en.wikipedia.org/wiki/Rust_(language)\""));
    }

    #[test]
    fn escaped_ampersands_survive_in_href() {
        let html = linkify("<p>https://example.com/?a=1&amp;b=2</p>").expect("linkify");
        assert!(html.contains("href=\"https://example.com/?a=1&amp;b=2\""));
    }

    #[test]
    fn escaped_angle_bracket_ends_url() {
        let html = linkify("<p>https://example.com&gt; done</p>").expect("linkify");
        assert!(html.contains(">https://example.com</a>&gt; done"));
    }

    #[test]
    fn emails_become_mailto_links() {
        let html = linkify("<p>Write to team@example.com today</p>").expect("linkify");
        assert!(html.contains(
            "<a href=\"mailto:team@example.com\" rel=\"nofollow\">team@example.com</a>"
        ));
    }

    #[test]
    fn bare_domains_are_linked_over_http() {
        let html = linkify("<p>Docs live at example.com or docs.example.org/guide.</p>")
            .expect("linkify");
        assert!(html.contains(
            "at <a href=\"http://example.com\" rel=\"nofollow\">example.com</a> or"
        ));
        assert!(html.contains(
            "<a href=\"http://docs.example.org/guide\" rel=\"nofollow\">docs.example.org/guide</a>.</p>"
        ));
    }

    #[test]
    fn unknown_suffixes_and_emails_are_not_bare_domains() {
        let input = "<p>Open main.rs and config.toml</p>";
        assert_eq!(linkify(input).expect("linkify"), input);

        let html = linkify("<p>ping ops@example.com</p>").expect("linkify");
        assert!(html.contains("href=\"mailto:ops@example.com\""));
        assert!(!html.contains("http://example.com"));
    }

    #[test]
    fn text_without_links_is_untouched() {
        let input = "<p>Nothing &amp; nobody here</p>";
        assert_eq!(linkify(input).expect("linkify"), input);
    }

    #[test]
    fn top_level_text_is_linked() {
        let html = linkify("hello https://example.com").expect("linkify");
        assert_eq!(
            html,
            "hello <a href=\"https://example.com\" rel=\"nofollow\">https://example.com</a>"
        );
    }
}
