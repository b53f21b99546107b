//! URL resolution and AMP/mobile alternate-URL generation.

use url::Url;

/// Resolve `href` against `base`, returning `None` for anything that isn't
/// a usable absolute http(s) URL (relative-but-unparseable, `data:`,
/// `javascript:`, `mailto:`, etc).
#[must_use]
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("data:") || href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }

    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Whether `url` is an absolute, well-formed http(s) URL.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }
    Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Generate candidate AMP/mobile variant URLs for `url`, deduplicated,
/// order-preserved, capped at `max`.
///
/// Strategies, in priority order:
/// 1. `/amp` path prefix (`example.com/amp/article` for `example.com/article`)
/// 2. `/amp` path suffix (`example.com/article/amp`)
/// 3. `outputType=amp` query parameter appended to the original URL
/// 4. `m.` host subdomain prefix
///
/// This is best-effort: some of these templates won't exist on a given
/// domain, and a generated URL may 404. The orchestrator treats that as
/// just another failed alternate.
#[must_use]
pub fn generate_alternates(url: &Url, max: usize) -> Vec<Url> {
    let mut alternates = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let mut push = |candidate: Option<Url>| {
        if alternates.len() >= max {
            return;
        }
        if let Some(candidate) = candidate {
            if candidate == *url {
                return;
            }
            if seen.insert(candidate.to_string()) {
                alternates.push(candidate);
            }
        }
    };

    push(amp_path_prefix(url));
    push(amp_path_suffix(url));
    push(amp_query_param(url));
    push(mobile_subdomain(url));

    alternates.truncate(max);
    alternates
}

fn amp_path_prefix(url: &Url) -> Option<Url> {
    let path = url.path();
    if path == "/amp" || path.starts_with("/amp/") {
        return None;
    }
    let mut out = url.clone();
    let new_path = if path == "/" {
        "/amp".to_string()
    } else {
        format!("/amp{path}")
    };
    out.set_path(&new_path);
    Some(out)
}

fn amp_path_suffix(url: &Url) -> Option<Url> {
    let path = url.path().trim_end_matches('/');
    if path == "/amp" || path.ends_with("/amp") {
        return None;
    }
    let mut out = url.clone();
    out.set_path(&format!("{path}/amp"));
    Some(out)
}

fn amp_query_param(url: &Url) -> Option<Url> {
    let mut out = url.clone();
    out.query_pairs_mut().append_pair("outputType", "amp");
    Some(out)
}

fn mobile_subdomain(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    if host.starts_with("m.") {
        return None;
    }
    let mut out = url.clone();
    out.set_host(Some(&format!("m.{host}"))).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn resolves_relative_href_against_base() {
        let base = u("https://example.com/articles/one");
        assert_eq!(
            resolve(&base, "/images/a.jpg").unwrap().as_str(),
            "https://example.com/images/a.jpg"
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        let base = u("https://example.com/articles/one");
        assert!(resolve(&base, "javascript:void(0)").is_none());
        assert!(resolve(&base, "data:image/png;base64,abc").is_none());
        assert!(resolve(&base, "mailto:a@b.com").is_none());
    }

    #[test]
    fn generates_deduplicated_alternates_capped() {
        let url = u("https://example.com/articles/one");
        let alternates = generate_alternates(&url, 4);
        assert_eq!(alternates.len(), 4);
        assert_eq!(alternates[0].as_str(), "https://example.com/amp/articles/one");
        assert_eq!(alternates[1].as_str(), "https://example.com/articles/one/amp");
        assert!(alternates[2].as_str().contains("outputType=amp"));
        assert_eq!(alternates[3].host_str().unwrap(), "m.example.com");
    }

    #[test]
    fn generate_alternates_is_idempotent() {
        let url = u("https://example.com/articles/one");
        let first = generate_alternates(&url, 4);
        let second = generate_alternates(&url, 4);
        assert_eq!(
            first.iter().map(Url::to_string).collect::<Vec<_>>(),
            second.iter().map(Url::to_string).collect::<Vec<_>>()
        );
    }

    #[test]
    fn mobile_subdomain_skipped_when_already_mobile() {
        let url = u("https://m.example.com/articles/one");
        let alternates = generate_alternates(&url, 4);
        assert!(alternates.iter().all(|a| a.host_str() != Some("m.m.example.com")));
    }
}
