//! Anti-bot challenge-page detection.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Body substrings (already lowercased) that mark a page as a challenge
/// interstitial rather than real content. Matching is always
/// lowercase-both-sides substring containment: see [`is_challenge`].
static BODY_MARKERS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "attention required",
        "cloudflare ray id",
        "what can i do to resolve this?",
        "why have i been blocked?",
        "performance & security by cloudflare",
        "cf-browser-verification",
        "turnstile",
        "challenge-platform",
    ]
});

/// Title substrings (already lowercased) associated with challenge pages.
static TITLE_MARKERS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec!["just a moment", "attention required", "please wait"]
});

/// The provider believed to be serving a detected challenge page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeProvider {
    Cloudflare,
    Unknown,
}

/// Whether `html` (optionally paired with a `status` and `server_header`)
/// looks like an anti-bot challenge page rather than real content.
///
/// A 200-status page with a matching body marker still counts: some
/// providers serve challenges with a 200 while content loads via JS.
#[must_use]
pub fn is_challenge(html: &str, status: Option<StatusCode>, server_header: Option<&str>) -> bool {
    let lower_html = html.to_lowercase();

    if BODY_MARKERS.iter().any(|marker| lower_html.contains(marker)) {
        return true;
    }

    if let Some(title) = extract_title(&lower_html) {
        if TITLE_MARKERS.iter().any(|marker| title.contains(marker)) {
            return true;
        }
    }

    let status_suggests_challenge = status
        .map(|s| matches!(s.as_u16(), 403 | 409 | 503))
        .unwrap_or(false);

    if status_suggests_challenge {
        if let Some(server) = server_header {
            let server_lower = server.to_lowercase();
            if server_lower.contains("cloudflare") {
                return true;
            }
        }
    }

    false
}

/// Best-effort classification of which provider is serving a detected
/// challenge, given the same inputs as [`is_challenge`] plus any
/// `cf-ray` header observed.
#[must_use]
pub fn classify_provider(html: &str, server_header: Option<&str>, cf_ray_header: Option<&str>) -> ChallengeProvider {
    let lower_html = html.to_lowercase();
    let server_is_cloudflare = server_header
        .map(|s| s.to_lowercase().contains("cloudflare"))
        .unwrap_or(false);

    if server_is_cloudflare
        || cf_ray_header.is_some()
        || lower_html.contains("cloudflare")
        || lower_html.contains("turnstile")
        || lower_html.contains("challenge-platform")
    {
        return ChallengeProvider::Cloudflare;
    }

    ChallengeProvider::Unknown
}

fn extract_title(lower_html: &str) -> Option<String> {
    let start = lower_html.find("<title")?;
    let after_open = &lower_html[start..];
    let tag_close = after_open.find('>')? + start + 1;
    let end = lower_html[tag_close..].find("</title>")? + tag_close;
    Some(lower_html[tag_close..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cloudflare_title_marker() {
        let html = "<html><head><title>Just a moment...</title></head><body></body></html>";
        assert!(is_challenge(html, Some(StatusCode::OK), None));
    }

    #[test]
    fn detects_body_marker_regardless_of_status() {
        let html = "<html><body>Why have I been blocked? This website is using a security service.</body></html>";
        assert!(is_challenge(html, Some(StatusCode::OK), None));
    }

    #[test]
    fn detects_status_and_server_combo() {
        let html = "<html><body>Access denied</body></html>";
        assert!(is_challenge(
            html,
            Some(StatusCode::SERVICE_UNAVAILABLE),
            Some("cloudflare")
        ));
    }

    #[test]
    fn plain_page_is_not_a_challenge() {
        let html = "<html><head><title>My Article</title></head><body><p>Hello world</p></body></html>";
        assert!(!is_challenge(html, Some(StatusCode::OK), None));
    }

    #[test]
    fn classifies_cloudflare_via_header() {
        let provider = classify_provider("<html></html>", Some("cloudflare"), Some("abc-DFW"));
        assert_eq!(provider, ChallengeProvider::Cloudflare);
    }

    #[test]
    fn classifies_unknown_when_no_markers() {
        let provider = classify_provider("<html><body>hi</body></html>", None, None);
        assert_eq!(provider, ChallengeProvider::Unknown);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let html = "<html><head><title>JUST A MOMENT</title></head></html>";
        assert!(is_challenge(html, Some(StatusCode::OK), None));
    }
}
