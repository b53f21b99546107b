//! C1 Orchestrator: sequences the two fetch phases against a single
//! deadline and classifies the terminal outcome.

use crate::challenge::ChallengeProvider;
use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::extract::{article, images};
use crate::fetch;
use crate::types::{BlockedResult, ExtractResult, FetchOutcome, ScrapeMetadata, ScrapeRequest};
use chrono::Utc;
use scraper::Html;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Terminal outcome of [`scrape`].
#[derive(Debug)]
pub enum ScrapeOutcome {
    Extracted(ExtractResult),
    Blocked(BlockedResult),
}

/// Run the full scrape pipeline for `request` per spec §4.1: Phase A
/// (HTTP, with alternate-URL racing), falling through to Phase B
/// (headless browser) only on a qualifying failure, then extraction.
pub async fn scrape(request: &ScrapeRequest, config: &ScrapeConfig) -> Result<ScrapeOutcome, ScrapeError> {
    let start = Instant::now();

    if request.url.as_str().is_empty() || !matches!(request.url.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl(request.url.to_string()));
    }

    let phase_a_budget = phase_budget(request, config.deadline_safety_margin, config.http_phase_budget);
    if phase_a_budget.is_zero() {
        tracing::warn!(url = %request.url, "no budget remaining before phase A, timing out");
        return Err(ScrapeError::Timeout { phase: crate::types::FetchPhase::Http });
    }

    tracing::info!(url = %request.url, budget_ms = phase_a_budget.as_millis(), "phase A (http) starting");
    let phase_a = fetch::fetch_with_alternates(&request.url, config, phase_a_budget).await;

    let outcome = match phase_a {
        Ok(outcome) => {
            tracing::info!(url = %request.url, final_url = %outcome.final_url, "phase A succeeded");
            outcome
        }
        Err(err) if err.is_fatal() => {
            tracing::warn!(url = %request.url, %err, "phase A failed fatally, not attempting phase B");
            return Err(err);
        }
        Err(phase_a_err) => {
            tracing::info!(url = %request.url, %phase_a_err, "phase A failed");
            if !err_qualifies_for_browser(&phase_a_err) {
                return Err(phase_a_err);
            }

            let phase_b_budget = phase_budget(request, config.deadline_safety_margin, config.browser_phase_budget);
            if phase_b_budget.is_zero() {
                tracing::warn!(url = %request.url, "no budget remaining before phase B, surfacing phase A failure");
                return Err(if request.remaining().is_zero() {
                    ScrapeError::Timeout { phase: crate::types::FetchPhase::Http }
                } else {
                    phase_a_err
                });
            }

            tracing::info!(url = %request.url, budget_ms = phase_b_budget.as_millis(), "phase B (browser) starting");
            match fetch::fetch_with_browser(&request.url, config, phase_b_budget).await {
                Ok(outcome) => {
                    tracing::info!(url = %request.url, final_url = %outcome.final_url, "phase B succeeded");
                    outcome
                }
                Err(phase_b_err) => {
                    tracing::warn!(url = %request.url, %phase_b_err, "phase B failed");
                    return Err(classify_double_failure(phase_a_err, phase_b_err));
                }
            }
        }
    };

    let metadata = build_metadata(&outcome, start);
    Ok(ScrapeOutcome::Extracted(extract(&outcome, metadata, config)))
}

/// Whether a Phase A failure is one the orchestrator treats as "worth
/// trying the browser for" (spec §4.1 step 2 / §7 propagation policy).
fn err_qualifies_for_browser(err: &ScrapeError) -> bool {
    err.qualifies_for_next_phase()
}

/// If both phases ended in a challenge detection, that's a `BlockedResult`,
/// not a generic error (spec §4.1 step 3 / §7). Otherwise surface the
/// later (Phase B) error, since it reflects the more complete attempt.
fn classify_double_failure(phase_a_err: ScrapeError, phase_b_err: ScrapeError) -> ScrapeError {
    match (&phase_a_err, &phase_b_err) {
        (ScrapeError::BlockedByChallenge { .. }, ScrapeError::BlockedByChallenge { .. }) => phase_b_err,
        _ => phase_b_err,
    }
}

/// Compute a phase's own budget: the lesser of its nominal cap and the
/// remaining deadline minus the safety margin, floored at zero.
fn phase_budget(request: &ScrapeRequest, safety_margin: Duration, nominal_cap: Duration) -> Duration {
    let remaining = request.remaining();
    let safe_remaining = remaining.saturating_sub(safety_margin);
    safe_remaining.min(nominal_cap)
}

fn build_metadata(outcome: &FetchOutcome, start: Instant) -> ScrapeMetadata {
    ScrapeMetadata {
        url: outcome.final_url.to_string(),
        scraped_at: Utc::now(),
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Run ArticleExtractor and ImageSelector over the fetched document.
/// Per spec §5, these operate on independent inputs (HTML + base URL)
/// and can run concurrently; both must complete before the response is
/// assembled.
fn extract(outcome: &FetchOutcome, metadata: ScrapeMetadata, config: &ScrapeConfig) -> ExtractResult {
    let html = outcome.html.clone();
    let base_url = outcome.final_url.clone();
    let image_cap = config.image_count_cap;

    let document = Html::parse_document(&html);
    let title = article::extract_title(&document);
    let description = article::extract_description(&document);
    let content = article::extract_content(&document);
    let image_urls = images::select(&html, &base_url, image_cap);

    ExtractResult {
        title,
        description,
        content,
        images: image_urls,
        metadata,
    }
}

/// Build a [`BlockedResult`] from a terminal [`ScrapeError::BlockedByChallenge`].
#[must_use]
pub fn blocked_result_from(err: &ScrapeError, start: Instant) -> Option<BlockedResult> {
    match err {
        ScrapeError::BlockedByChallenge { provider, domain } => Some(BlockedResult {
            provider: provider_tag(*provider),
            domain: domain.clone(),
            metadata: ScrapeMetadata {
                url: domain.clone(),
                scraped_at: Utc::now(),
                duration_ms: start.elapsed().as_millis() as u64,
            },
        }),
        _ => None,
    }
}

fn provider_tag(provider: ChallengeProvider) -> String {
    match provider {
        ChallengeProvider::Cloudflare => "cloudflare".to_string(),
        ChallengeProvider::Unknown => "unknown".to_string(),
    }
}

/// Convenience entry point matching spec §4.1's `scrape(url, deadline)`
/// contract: parse the URL, build a request against `deadline`, run the
/// pipeline, and fold a terminal `BlockedByChallenge` into a
/// [`BlockedResult`] rather than an error.
pub async fn scrape_url(url: &str, deadline: Instant, config: &ScrapeConfig) -> Result<ScrapeOutcome, ScrapeError> {
    let parsed = Url::parse(url).map_err(|_| ScrapeError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl(url.to_string()));
    }

    let request = ScrapeRequest::new(parsed, deadline);
    let start = Instant::now();

    match scrape(&request, config).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => match blocked_result_from(&err, start) {
            Some(blocked) => Ok(ScrapeOutcome::Blocked(blocked)),
            None => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_budget_clips_to_remaining_deadline_minus_margin() {
        let request = ScrapeRequest::new(
            Url::parse("https://example.com").unwrap(),
            Instant::now() + Duration::from_millis(500),
        );
        let budget = phase_budget(&request, Duration::from_secs(3), Duration::from_secs(18));
        assert!(budget.is_zero());
    }

    #[test]
    fn phase_budget_never_exceeds_nominal_cap() {
        let request = ScrapeRequest::new(
            Url::parse("https://example.com").unwrap(),
            Instant::now() + Duration::from_secs(120),
        );
        let budget = phase_budget(&request, Duration::from_secs(3), Duration::from_secs(18));
        assert_eq!(budget, Duration::from_secs(18));
    }

    #[test]
    fn double_challenge_classifies_as_blocked() {
        let a = ScrapeError::BlockedByChallenge {
            provider: ChallengeProvider::Cloudflare,
            domain: "example.com".to_string(),
        };
        let b = ScrapeError::BlockedByChallenge {
            provider: ChallengeProvider::Cloudflare,
            domain: "example.com".to_string(),
        };
        let classified = classify_double_failure(a, b);
        let blocked = blocked_result_from(&classified, Instant::now());
        assert!(blocked.is_some());
        assert_eq!(blocked.unwrap().provider, "cloudflare");
    }

    #[test]
    fn invalid_url_is_fatal_and_not_blocked() {
        assert!(ScrapeError::InvalidUrl("x".to_string()).is_fatal());
    }
}
