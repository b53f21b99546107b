//! Title, description, and body extraction from a fetched HTML document.

use crate::extract::text::{raw_text_excluding_chrome, structured_text};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Main-content container selectors, in priority order. Extends the
/// fallback list with `.article-content` and `.story-content` beyond the
/// base set.
static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "article",
        "main",
        "[role=main]",
        ".content",
        ".post-content",
        ".entry-content",
        ".article-content",
        ".story-content",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("BUG: hardcoded content selector is invalid"))
    .collect()
});

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("BUG: hardcoded body selector is invalid"));
static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("BUG: hardcoded h1 selector is invalid"));
static TITLE_TAG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("BUG: hardcoded title selector is invalid"));
static P_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("BUG: hardcoded p selector is invalid"));

fn meta_content(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolve the article title: `og:title`, then `twitter:title`, then the
/// first `<h1>`, then `<title>`.
#[must_use]
pub fn extract_title(document: &Html) -> Option<String> {
    meta_content(document, r#"meta[property="og:title"]"#)
        .or_else(|| meta_content(document, r#"meta[name="twitter:title"]"#))
        .or_else(|| {
            document
                .select(&H1_SELECTOR)
                .next()
                .map(|el| structured_text(el))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            document
                .select(&TITLE_TAG_SELECTOR)
                .next()
                .map(|el| el.text().collect::<String>())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the article description: `og:description`, then
/// `twitter:description`, then `<meta name="description">`, else the
/// first `<p>` whose text length falls in `[50, 300]` characters.
#[must_use]
pub fn extract_description(document: &Html) -> Option<String> {
    meta_content(document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(document, r#"meta[name="twitter:description"]"#))
        .or_else(|| meta_content(document, r#"meta[name="description"]"#))
        .or_else(|| {
            document.select(&P_SELECTOR).find_map(|el| {
                let text = el.text().collect::<String>();
                let trimmed = text.trim();
                let len = trimmed.chars().count();
                (50..=300).contains(&len).then(|| trimmed.to_string())
            })
        })
}

/// Locate the main-content container via the priority selector list,
/// falling back to `<body>`.
#[must_use]
pub fn main_content_container(document: &Html) -> Option<ElementRef<'_>> {
    for selector in CONTENT_SELECTORS.iter() {
        if let Some(element) = document.select(selector).next() {
            return Some(element);
        }
    }
    document.select(&BODY_SELECTOR).next()
}

static DENSITY_CANDIDATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div, section, article, main")
        .expect("BUG: hardcoded density candidate selector is invalid")
});

/// Readability-style main-content pass: score every `div`/`section`/
/// `article`/`main` by how much of its text sits inside `<p>` tags versus
/// inside `<a>` tags, and return the highest-scoring candidate whose
/// paragraph text clears a minimum length. This catches layouts where the
/// real article body isn't wrapped in any of [`CONTENT_SELECTORS`] (e.g.
/// a bare `<div class="post">`), which the selector-based fallback path
/// would miss entirely.
fn readability_main_content(document: &Html) -> Option<ElementRef<'_>> {
    let mut best: Option<(ElementRef<'_>, f64)> = None;

    for candidate in document.select(&DENSITY_CANDIDATE_SELECTOR) {
        let paragraph_text_len: usize = candidate
            .select(&P_SELECTOR)
            .map(|p| p.text().collect::<String>().trim().len())
            .sum();
        if paragraph_text_len < 140 {
            continue;
        }

        let link_text_len: usize = {
            let a_selector = Selector::parse("a").expect("BUG: hardcoded 'a' selector is invalid");
            candidate
                .select(&a_selector)
                .map(|a| a.text().collect::<String>().len())
                .sum()
        };
        let total_text_len = candidate.text().collect::<String>().trim().len().max(1);
        let link_density = link_text_len as f64 / total_text_len as f64;
        if link_density > 0.5 {
            continue;
        }

        let paragraph_count = candidate.select(&P_SELECTOR).count();
        let score = (paragraph_text_len as f64) * (1.0 - link_density) + (paragraph_count as f64) * 20.0;

        if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
            best = Some((candidate, score));
        }
    }

    best.map(|(el, _)| el)
}

/// Extract structured body text from `document`. Preferred path: the
/// readability-style density pass, converted to structured text. If that
/// yields nothing (no candidate clears the density/length thresholds),
/// fall back to the priority-selector container; if the structured pass
/// over *that* is also empty, fall back further to its raw text with
/// script/style/nav/header/footer subtrees excluded.
#[must_use]
pub fn extract_content(document: &Html) -> Option<String> {
    if let Some(container) = readability_main_content(document) {
        let structured = structured_text(container);
        if !structured.is_empty() {
            return Some(structured);
        }
    }

    let container = main_content_container(document)?;
    let structured = structured_text(container);
    if !structured.is_empty() {
        return Some(structured);
    }

    let fallback = raw_text_excluding_chrome(container);
    (!fallback.is_empty()).then_some(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_og_title() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG Title">
            <title>Fallback Title</title>
        </head><body><h1>H1 Title</h1></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(extract_title(&document).as_deref(), Some("OG Title"));
    }

    #[test]
    fn title_falls_back_through_chain() {
        let html = r#"<html><head><title>Only Title</title></head><body></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(extract_title(&document).as_deref(), Some("Only Title"));
    }

    #[test]
    fn title_falls_back_to_h1_before_title_tag() {
        let html = r#"<html><head><title>Doc Title</title></head><body><h1>Heading One</h1></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(extract_title(&document).as_deref(), Some("Heading One"));
    }

    #[test]
    fn description_falls_back_to_sized_paragraph() {
        let long_enough = "This paragraph is deliberately written to land comfortably between fifty and three hundred characters in length for the test.";
        assert!((50..=300).contains(&long_enough.chars().count()));
        let html = format!("<html><body><p>Too short.</p><p>{long_enough}</p></body></html>");
        let document = Html::parse_document(&html);
        assert_eq!(extract_description(&document).as_deref(), Some(long_enough));
    }

    #[test]
    fn description_prefers_og_description() {
        let html = r#"<html><head><meta property="og:description" content="Summary here."></head><body><p>Irrelevant body paragraph that is long enough to otherwise qualify as a fallback description candidate here.</p></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(
            extract_description(&document).as_deref(),
            Some("Summary here.")
        );
    }

    #[test]
    fn content_prefers_article_container() {
        let html = r#"<html><body><div class="sidebar">Nav junk</div><article><p>Real article text.</p></article></body></html>"#;
        let document = Html::parse_document(html);
        let content = extract_content(&document).unwrap();
        assert!(content.contains("Real article text."));
        assert!(!content.contains("Nav junk"));
    }

    #[test]
    fn content_falls_back_to_body_when_no_container_matches() {
        let html = "<html><body><p>Only content here.</p></body></html>";
        let document = Html::parse_document(html);
        let content = extract_content(&document).unwrap();
        assert!(content.contains("Only content here."));
    }

    #[test]
    fn readability_pass_prefers_paragraph_dense_div_over_link_heavy_nav() {
        let html = r#"<html><body>
            <div class="sidebar-nav">
                <a href="/a">Link one that repeats often</a>
                <a href="/b">Link two that repeats often</a>
                <a href="/c">Link three that repeats often</a>
                <a href="/d">Link four that repeats often</a>
            </div>
            <div class="post">
                <p>This is the first paragraph of the real article body, long enough to clear the density threshold on its own.</p>
                <p>This is the second paragraph continuing the real article body with more substantive prose content here.</p>
            </div>
        </body></html>"#;
        let document = Html::parse_document(html);
        let content = extract_content(&document).unwrap();
        assert!(content.contains("first paragraph of the real article body"));
        assert!(!content.contains("Link one that repeats often"));
    }
}
