//! Representative-image discovery, filtering, and scoring.

use crate::types::{ImageCandidate, ImageSource};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

/// Aspect ratios considered "natural" for article imagery; a candidate's
/// aspect ratio counts as whitelisted if it falls within `WHITELIST_TOLERANCE`
/// of any of these.
const ASPECT_WHITELIST: &[f64] = &[1.333, 1.5, 1.6, 1.667, 1.777, 1.85, 2.0];
const WHITELIST_TOLERANCE: f64 = 0.09;
const ASPECT_MIN: f64 = 0.5;
const ASPECT_MAX: f64 = 2.6;

const MIN_DIMENSION: u32 = 300;
const MIN_AREA: u64 = 140_000;
const BAD_HINT_MIN_DIMENSION: u32 = 400;
const BAD_HINT_MIN_AREA: u64 = 300_000;

/// Common ad-creative pixel sizes; an exact `width x height` match is
/// rejected outright since it's almost certainly a banner, not article art.
const AD_SIZES: &[(u32, u32)] = &[
    (728, 90),
    (970, 90),
    (970, 250),
    (468, 60),
    (320, 50),
    (300, 50),
    (300, 250),
    (336, 280),
    (300, 600),
    (160, 600),
    (120, 600),
    (250, 250),
    (200, 200),
    (180, 150),
    (234, 60),
    (120, 240),
    (88, 31),
];

static BAD_HINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sprite|icon|favicon|logo|avatar|emoji|placeholder|pixel|tracker|ads?|adserver|promo|beacon")
        .expect("BUG: hardcoded bad-hint regex is invalid")
});

static DIMENSION_IN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{3,4})x(\d{3,4})\b").expect("BUG: hardcoded dimension regex is invalid")
});

static STYLE_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)width\s*:\s*(\d+)px").expect("BUG: hardcoded style-width regex is invalid")
});
static STYLE_HEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)height\s*:\s*(\d+)px").expect("BUG: hardcoded style-height regex is invalid")
});

static OG_IMAGE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[property="og:image:secure_url"]"#)
        .expect("BUG: hardcoded og:image selector is invalid")
});
static OG_WIDTH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:image:width"]"#).expect("BUG: hardcoded selector is invalid")
});
static OG_HEIGHT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:image:height"]"#).expect("BUG: hardcoded selector is invalid")
});
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("BUG: hardcoded img selector is invalid"));
static ARTICLE_SCOPE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("article, main").expect("BUG: hardcoded article scope selector is invalid")
});

/// Select up to `limit` representative image URLs from `html`, resolved
/// against `base_url`.
#[must_use]
pub fn select(html: &str, base_url: &Url, limit: usize) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    let document = Html::parse_document(html);
    let article_scope_urls = article_scope_image_urls(&document, base_url);

    let mut candidates = Vec::new();
    candidates.extend(discover_og_images(&document, base_url));
    candidates.extend(discover_img_sweep(&document, base_url, &article_scope_urls));

    let normalized = normalize_and_dedupe(candidates);
    let filtered: Vec<ImageCandidate> = normalized.into_iter().filter(passes_filter).collect();

    let mut scored: Vec<ImageCandidate> = filtered
        .into_iter()
        .map(|mut c| {
            c.score = score(&c);
            c
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.area.cmp(&a.area))
    });

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for candidate in scored {
        let key = candidate.url.to_string();
        if seen.insert(key.clone()) {
            out.push(key);
            if out.len() >= limit {
                break;
            }
        }
    }
    out
}

fn article_scope_image_urls(document: &Html, base_url: &Url) -> std::collections::HashSet<String> {
    let mut urls = std::collections::HashSet::new();
    for scope in document.select(&ARTICLE_SCOPE_SELECTOR) {
        for img in scope.select(&IMG_SELECTOR) {
            if let Some(src) = best_img_src_raw(&img) {
                if let Some(resolved) = crate::urls::resolve(base_url, &src) {
                    urls.insert(resolved.to_string());
                }
            }
        }
    }
    urls
}

fn discover_og_images(document: &Html, base_url: &Url) -> Vec<ImageCandidate> {
    let meta_width = meta_number(document, &OG_WIDTH_SELECTOR);
    let meta_height = meta_number(document, &OG_HEIGHT_SELECTOR);

    document
        .select(&OG_IMAGE_SELECTOR)
        .filter_map(|el| el.value().attr("content"))
        .filter_map(|content| crate::urls::resolve(base_url, content))
        .map(|url| {
            let bad_hint = BAD_HINT_PATTERN.is_match(url.as_str());
            let (width, height) = match (meta_width, meta_height) {
                (Some(w), Some(h)) => (Some(w), Some(h)),
                _ => dimensions_from_url(url.as_str()).unzip(),
            };
            ImageCandidate {
                url,
                width,
                height,
                in_article_scope: true,
                bad_hint,
                source: ImageSource::Og,
                score: 0.0,
                area: 0,
            }
        })
        .collect()
}

fn meta_number(document: &Html, selector: &Selector) -> Option<u32> {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .and_then(|v| v.trim().parse().ok())
}

fn discover_img_sweep(
    document: &Html,
    base_url: &Url,
    article_scope_urls: &std::collections::HashSet<String>,
) -> Vec<ImageCandidate> {
    document
        .select(&IMG_SELECTOR)
        .filter_map(|img| {
            let raw = best_img_src(&img)?;
            let url = crate::urls::resolve(base_url, &raw)?;
            let bad_hint = BAD_HINT_PATTERN.is_match(url.as_str());
            let in_article_scope = article_scope_urls.contains(&url.to_string());
            let (width, height) = dimensions_from_attrs(&img).or_else(|| dimensions_from_url(url.as_str())).unzip();
            Some(ImageCandidate {
                url,
                width,
                height,
                in_article_scope,
                bad_hint,
                source: ImageSource::Img,
                score: 0.0,
                area: 0,
            })
        })
        .collect()
}

fn best_img_src_raw(img: &scraper::ElementRef) -> Option<String> {
    best_img_src(img)
}

/// Pick the best single source URL for an `<img>`, preferring an explicit
/// attribute (`src`, `data-src`, `data-original`, `data-lazy-src`) and
/// falling back to the best `srcset` candidate.
fn best_img_src(img: &scraper::ElementRef) -> Option<String> {
    for attr in ["src", "data-src", "data-original", "data-lazy-src"] {
        if let Some(value) = img.value().attr(attr) {
            let trimmed = value.trim();
            if !trimmed.is_empty() && !trimmed.starts_with("data:") {
                return Some(trimmed.to_string());
            }
        }
    }
    img.value()
        .attr("srcset")
        .and_then(|srcset| select_from_srcset(srcset))
}

/// Select the best candidate from a `srcset` attribute: prefer the
/// width descriptor closest to 1000w (ties broken toward the larger),
/// else the largest density descriptor, else the last entry listed.
fn select_from_srcset(srcset: &str) -> Option<String> {
    let entries: Vec<(String, Option<f64>, Option<f64>)> = srcset
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let mut parts = entry.split_whitespace();
            let url = parts.next()?.to_string();
            let descriptor = parts.next();
            let (width, density) = match descriptor {
                Some(d) if d.ends_with('w') => (d.trim_end_matches('w').parse::<f64>().ok(), None),
                Some(d) if d.ends_with('x') => (None, d.trim_end_matches('x').parse::<f64>().ok()),
                _ => (None, None),
            };
            Some((url, width, density))
        })
        .collect();

    if entries.is_empty() {
        return None;
    }

    if entries.iter().any(|(_, w, _)| w.is_some()) {
        return entries
            .iter()
            .filter_map(|(url, w, _)| w.map(|w| (url, w)))
            .min_by(|(_, a), (_, b)| {
                let da = (a - 1000.0).abs();
                let db = (b - 1000.0).abs();
                da.partial_cmp(&db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal))
            })
            .map(|(url, _)| url.clone());
    }

    if entries.iter().any(|(_, _, d)| d.is_some()) {
        return entries
            .iter()
            .filter_map(|(url, _, d)| d.map(|d| (url, d)))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(url, _)| url.clone());
    }

    entries.last().map(|(url, _, _)| url.clone())
}

/// Read width/height from `width`/`height` attributes, falling back to
/// an inline `style="width: Npx; height: Npx"` declaration.
fn dimensions_from_attrs(img: &scraper::ElementRef) -> Option<(u32, u32)> {
    let attr_width = img.value().attr("width").and_then(|v| v.trim().parse().ok());
    let attr_height = img.value().attr("height").and_then(|v| v.trim().parse().ok());
    if let (Some(w), Some(h)) = (attr_width, attr_height) {
        return Some((w, h));
    }

    let style = img.value().attr("style")?;
    let style_width = STYLE_WIDTH
        .captures(style)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let style_height = STYLE_HEIGHT
        .captures(style)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    match (attr_width.or(style_width), attr_height.or(style_height)) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => None,
    }
}

/// Backfill dimensions from the URL itself: either a `WxH` pattern
/// (`image-1200x800.jpg`) or `w=`/`width=`/`h=`/`height=` query params.
fn dimensions_from_url(url: &str) -> Option<(u32, u32)> {
    if let Some(captures) = DIMENSION_IN_URL.captures(url) {
        let w = captures.get(1)?.as_str().parse().ok()?;
        let h = captures.get(2)?.as_str().parse().ok()?;
        return Some((w, h));
    }

    if let Ok(parsed) = Url::parse(url) {
        let mut width = None;
        let mut height = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "w" | "width" => width = value.parse::<u32>().ok(),
                "h" | "height" => height = value.parse::<u32>().ok(),
                _ => {}
            }
        }
        if let (Some(w), Some(h)) = (width, height) {
            return Some((w, h));
        }
    }

    None
}

fn normalize_and_dedupe(candidates: Vec<ImageCandidate>) -> Vec<ImageCandidate> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| has_allowed_extension(c.url.as_str()))
        .filter(|c| seen.insert(c.url.to_string()))
        .map(|mut c| {
            c.area = match (c.width, c.height) {
                (Some(w), Some(h)) => u64::from(w) * u64::from(h),
                _ => 0,
            };
            c
        })
        .collect()
}

fn has_allowed_extension(url: &str) -> bool {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let lower = without_query.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(&format!(".{ext}")))
}

fn aspect_ratio(width: u32, height: u32) -> f64 {
    f64::from(width) / f64::from(height)
}

fn is_whitelisted_aspect(aspect: f64) -> bool {
    ASPECT_WHITELIST
        .iter()
        .any(|&w| (aspect - w).abs() <= WHITELIST_TOLERANCE)
}

fn is_ad_size(width: u32, height: u32) -> bool {
    AD_SIZES.contains(&(width, height))
}

fn passes_filter(candidate: &ImageCandidate) -> bool {
    let (width, height) = match (candidate.width, candidate.height) {
        (Some(w), Some(h)) => (w, h),
        _ => return !candidate.bad_hint,
    };

    let min_dim = width.min(height);
    let area = u64::from(width) * u64::from(height);
    let aspect = aspect_ratio(width, height);

    if min_dim < MIN_DIMENSION {
        return false;
    }
    if area < MIN_AREA {
        return false;
    }
    if (aspect < ASPECT_MIN || aspect > ASPECT_MAX) && !is_whitelisted_aspect(aspect) {
        return false;
    }
    if is_ad_size(width, height) {
        return false;
    }
    if candidate.bad_hint && (min_dim < BAD_HINT_MIN_DIMENSION || area < BAD_HINT_MIN_AREA) {
        return false;
    }

    true
}

fn score(candidate: &ImageCandidate) -> f64 {
    let mut score = 0.0;
    if candidate.in_article_scope {
        score += 2.0;
    }
    if candidate.source == ImageSource::Og {
        score += 1.0;
    }
    if let (Some(w), Some(h)) = (candidate.width, candidate.height) {
        if is_whitelisted_aspect(aspect_ratio(w, h)) {
            score += 1.0;
        }
    }
    score + (candidate.area.max(1) as f64).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/articles/one").unwrap()
    }

    #[test]
    fn picks_og_image_over_larger_out_of_scope_image() {
        let html = r#"
            <html><head>
                <meta property="og:image" content="https://example.com/hero-600x400.jpg">
            </head><body>
                <div class="sidebar"><img src="https://example.com/other-1600x1200.jpg"></div>
            </body></html>
        "#;
        let result = select(html, &base(), 3);
        assert_eq!(result[0], "https://example.com/hero-600x400.jpg");
    }

    #[test]
    fn rejects_tiny_images() {
        let html = r#"<html><body><img src="https://example.com/tiny.jpg" width="50" height="50"></body></html>"#;
        let result = select(html, &base(), 3);
        assert!(result.is_empty());
    }

    #[test]
    fn rejects_ad_sized_images() {
        let html = r#"<html><body><img src="https://example.com/banner.jpg" width="300" height="250"></body></html>"#;
        let result = select(html, &base(), 3);
        assert!(result.is_empty());
    }

    #[test]
    fn rejects_disallowed_extensions() {
        let html = r#"<html><body><img src="https://example.com/icon.svg" width="1000" height="700"></body></html>"#;
        let result = select(html, &base(), 3);
        assert!(result.is_empty());
    }

    #[test]
    fn bad_hint_images_need_larger_minimums() {
        let html = r#"<html><body><img src="https://example.com/promo-350x350.jpg"></body></html>"#;
        let result = select(html, &base(), 3);
        assert!(result.is_empty());
    }

    #[test]
    fn accepts_unknown_dimension_images_without_bad_hint() {
        let html = r#"<html><body><img src="https://example.com/photo.jpg"></body></html>"#;
        let result = select(html, &base(), 3);
        assert_eq!(result, vec!["https://example.com/photo.jpg"]);
    }

    #[test]
    fn zero_limit_returns_no_images() {
        let html = r#"<html><body><img src="https://example.com/photo.jpg"></body></html>"#;
        let result = select(html, &base(), 0);
        assert!(result.is_empty());
    }

    #[test]
    fn dedupes_and_caps_at_limit() {
        let html = r#"
            <html><body>
                <img src="https://example.com/a-1000x800.jpg">
                <img src="https://example.com/a-1000x800.jpg">
                <img src="https://example.com/b-1100x700.jpg">
                <img src="https://example.com/c-1200x900.jpg">
            </body></html>
        "#;
        let result = select(html, &base(), 2);
        assert_eq!(result.len(), 2);
        assert_eq!(result.iter().collect::<std::collections::HashSet<_>>().len(), 2);
    }

    #[test]
    fn srcset_prefers_closest_to_1000w() {
        let srcset = "https://example.com/s.jpg 400w, https://example.com/m.jpg 1000w, https://example.com/l.jpg 2000w";
        assert_eq!(
            select_from_srcset(srcset),
            Some("https://example.com/m.jpg".to_string())
        );
    }

    #[test]
    fn srcset_falls_back_to_density_then_last() {
        let density = "https://example.com/a.jpg 1x, https://example.com/b.jpg 2x";
        assert_eq!(
            select_from_srcset(density),
            Some("https://example.com/b.jpg".to_string())
        );

        let plain = "https://example.com/a.jpg, https://example.com/b.jpg";
        assert_eq!(
            select_from_srcset(plain),
            Some("https://example.com/b.jpg".to_string())
        );
    }
}
