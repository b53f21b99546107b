//! Structured-text assembly: turn a content subtree into clean,
//! whitespace-normalized plain text.

use regex::Regex;
use scraper::{ElementRef, Node};
use std::sync::LazyLock;

static MULTI_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "noscript"];
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const BLOCK_TAGS: &[&str] = &["p", "li", "blockquote"];

/// Render `element` into structured plain text: headings get a blank line
/// before and a newline after, paragraph/list-item/blockquote elements
/// get a leading newline, everything else is inlined. The result is then
/// whitespace-normalized: runs of 3+ newlines collapse to 2, runs of 2+
/// spaces collapse to 1, and the whole string is trimmed.
#[must_use]
pub fn structured_text(element: ElementRef) -> String {
    let mut buf = String::new();
    visit(element, &mut buf);
    normalize(&buf)
}

fn visit(element: ElementRef, buf: &mut String) {
    let tag = element.value().name();
    if SKIPPED_TAGS.contains(&tag) {
        return;
    }

    if HEADING_TAGS.contains(&tag) {
        buf.push_str("\n\n");
        push_inline_text(element, buf);
        buf.push('\n');
        return;
    }

    if BLOCK_TAGS.contains(&tag) {
        buf.push('\n');
        push_inline_text(element, buf);
        return;
    }

    for child in element.children() {
        visit_node(child, buf);
    }
}

fn visit_node(node: ego_tree::NodeRef<Node>, buf: &mut String) {
    match node.value() {
        Node::Text(text) => buf.push_str(text),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                visit(element, buf);
            }
        }
        _ => {}
    }
}

fn push_inline_text(element: ElementRef, buf: &mut String) {
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            buf.push_str(text);
        }
    }
}

fn normalize(raw: &str) -> String {
    // Text nodes can carry literal '<'/'>' from ordinary prose (e.g. "a < b"),
    // not just tags stripped during assembly; scrub them so no angle bracket
    // ever reaches the output regardless of source.
    let without_angle_brackets: String = raw.chars().filter(|&c| c != '<' && c != '>').collect();
    let collapsed_spaces = MULTI_SPACE.replace_all(&without_angle_brackets, " ");
    let collapsed_newlines = MULTI_NEWLINE.replace_all(&collapsed_spaces, "\n\n");
    collapsed_newlines.trim().to_string()
}

/// Fallback raw-text extraction used when structured assembly yields
/// nothing: strip `script`/`style`/`nav`/`header`/`footer` subtrees and
/// concatenate the remaining text nodes.
#[must_use]
pub fn raw_text_excluding_chrome(element: ElementRef) -> String {
    let mut buf = String::new();
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            let excluded = node.ancestors().any(|ancestor| {
                ElementRef::wrap(ancestor)
                    .map(|el| SKIPPED_TAGS.contains(&el.value().name()))
                    .unwrap_or(false)
            });
            if !excluded {
                buf.push_str(text);
                buf.push(' ');
            }
        }
    }
    normalize(&buf)
}

/// Truncate `s` to at most `max_chars` Unicode scalar values, never
/// splitting inside a multi-byte codepoint.
///
/// ```
/// # use article_scrape::extract::text::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("hello world", 5), "hello");
/// assert_eq!(safe_truncate_chars("hi", 10), "hi");
/// ```
#[must_use]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Find the best byte offset at or before `max_chars` characters into `s`
/// that lands on one of `boundary_chars` (e.g. whitespace), so truncation
/// can break between words instead of mid-word. Falls back to the exact
/// `max_chars` boundary if no boundary character is found.
///
/// ```
/// # use article_scrape::extract::text::safe_truncate_boundary;
/// let s = "hello world wide web";
/// let idx = safe_truncate_boundary(s, 8, &[' ']);
/// assert_eq!(&s[..idx], "hello");
/// ```
#[must_use]
pub fn safe_truncate_boundary(s: &str, max_chars: usize, boundary_chars: &[char]) -> usize {
    let truncated = safe_truncate_chars(s, max_chars);
    match truncated.rfind(boundary_chars) {
        Some(idx) => idx,
        None => truncated.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn parse_first(html: &str, selector: &str) -> String {
        let document = Html::parse_document(html);
        let sel = scraper::Selector::parse(selector).unwrap();
        let element = document.select(&sel).next().unwrap();
        structured_text(element)
    }

    #[test]
    fn headings_get_blank_line_separation() {
        let html = "<div><h2>Title</h2><p>Body text.</p></div>";
        let text = parse_first(html, "div");
        assert_eq!(text, "Title\nBody text.");
    }

    #[test]
    fn paragraphs_get_newline_prefix() {
        let html = "<div><p>One.</p><p>Two.</p></div>";
        let text = parse_first(html, "div");
        assert_eq!(text, "One.\nTwo.");
    }

    #[test]
    fn skips_script_and_style_subtrees() {
        let html = "<div><script>evil()</script><p>Real content.</p><style>.x{}</style></div>";
        let text = parse_first(html, "div");
        assert_eq!(text, "Real content.");
    }

    #[test]
    fn collapses_excess_whitespace() {
        let html = "<div><p>One.</p>\n\n\n\n<p>Two   with   spaces.</p></div>";
        let text = parse_first(html, "div");
        assert!(!text.contains("\n\n\n"));
        assert!(!text.contains("   "));
    }

    #[test]
    fn no_angle_brackets_in_output() {
        let html = "<div><p>Has <b>bold</b> and <i>italics</i>.</p></div>";
        let text = parse_first(html, "div");
        assert!(!text.contains('<') && !text.contains('>'));
    }

    #[test]
    fn strips_literal_angle_brackets_from_prose_text_nodes() {
        let html = "<div><p>if a &lt; b and 2 &gt; 1 then proceed</p></div>";
        let text = parse_first(html, "div");
        assert!(!text.contains('<') && !text.contains('>'));
        assert_eq!(text, "if a b and 2 1 then proceed");
    }

    #[test]
    fn truncate_chars_respects_unicode_boundaries() {
        let s = "héllo wörld";
        let truncated = safe_truncate_chars(s, 5);
        assert_eq!(truncated.chars().count(), 5);
    }
}
