//! Phase B: headless-browser fetch with request interception and
//! anti-bot identity spoofing.

use crate::browser_setup::{launch_browser, shutdown};
use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::stealth;
use crate::types::{FetchOutcome, FetchPhase, StatusHint};
use crate::urls::generate_alternates;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use futures_util::StreamExt;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

/// Domains whose subrequests are aborted regardless of resource type,
/// per spec §4.3's tracker denylist.
static TRACKER_DENYLIST: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "doubleclick.net",
        "googlesyndication.com",
        "google-analytics.com",
        "facebook.com/tr",
        "taboola.com",
        "outbrain.com",
        "scorecardresearch.com",
        "chartbeat.com",
        "amazon-adsystem.com",
    ]
});

fn is_tracker(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    TRACKER_DENYLIST.iter().any(|domain| lower.contains(domain))
}

fn should_abort(resource_type: &ResourceType, url: &str) -> bool {
    if is_tracker(url) {
        return true;
    }
    matches!(
        resource_type,
        ResourceType::Image | ResourceType::Media | ResourceType::Font | ResourceType::Stylesheet
    )
}

/// Subscribe to `Fetch.requestPaused` and continue/abort each request per
/// spec §4.3: always allow the document, abort image/media/font/stylesheet
/// subrequests and anything matching the tracker denylist, allow the rest.
async fn install_interception(page: &Page) -> anyhow::Result<()> {
    page.execute(EnableParams {
        patterns: Some(vec![RequestPattern {
            url_pattern: Some("*".to_string()),
            resource_type: None,
            request_stage: Some(fetch::RequestStage::Request),
        }]),
        handle_auth_requests: Some(false),
    })
    .await?;

    let mut paused = page.event_listener::<EventRequestPaused>().await?;
    let page = page.clone();

    tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let is_document = matches!(event.resource_type, ResourceType::Document);
            let verdict_abort = !is_document && should_abort(&event.resource_type, &event.request.url);

            let result = if verdict_abort {
                page.execute(FailRequestParams {
                    request_id: event.request_id.clone(),
                    error_reason: ErrorReason::BlockedByClient,
                })
                .await
                .map(|_| ())
            } else {
                page.execute(ContinueRequestParams {
                    request_id: event.request_id.clone(),
                    url: None,
                    method: None,
                    post_data: None,
                    headers: None,
                    intercept_response: None,
                })
                .await
                .map(|_| ())
            };

            if let Err(err) = result {
                tracing::debug!(%err, "failed to resolve intercepted request, browser likely tearing down");
            }
        }
    });

    Ok(())
}

/// How long `navigate_and_extract` waits after the page reports navigation
/// complete, per spec §4.3: the primary attempt uses a `networkidle`-style
/// wait, alternates use a faster `domcontentloaded`-style wait. chromiumoxide
/// has no first-class lifecycle-event wait condition (see the settle-time
/// idiom in the sibling headless-render pipeline's `wait_for_content_and_idle`),
/// so "network idle" is approximated as an additional settle period after
/// `wait_for_navigation` during which in-flight subresources finish loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitMode {
    /// `networkidle`-style: wait for navigation, then an extra settle period.
    NetworkIdle,
    /// `domcontentloaded`-style: wait for navigation only, no settle period.
    DomContentLoaded,
}

/// Extra settle time applied after `wait_for_navigation` under
/// [`WaitMode::NetworkIdle`], approximating "no in-flight requests" for a
/// short window the way `wait_for_content_and_idle`'s fixed idle sleep does.
const NETWORK_IDLE_SETTLE: Duration = Duration::from_millis(800);

/// Navigate to `url` under `wait_mode`, returning the rendered outer HTML.
async fn navigate_and_extract(
    page: &Page,
    url: &Url,
    budget: Duration,
    wait_mode: WaitMode,
) -> Result<(String, Url), ScrapeError> {
    let nav = page.goto(url.as_str());
    tokio::time::timeout(budget, nav)
        .await
        .map_err(|_| ScrapeError::Timeout { phase: FetchPhase::Browser })?
        .map_err(|e| ScrapeError::Transport(e.to_string()))?;

    tokio::time::timeout(budget, page.wait_for_navigation())
        .await
        .map_err(|_| ScrapeError::Timeout { phase: FetchPhase::Browser })?
        .map_err(|e| ScrapeError::Transport(e.to_string()))?;

    if wait_mode == WaitMode::NetworkIdle {
        tokio::time::sleep(NETWORK_IDLE_SETTLE).await;
    }

    let html = page
        .evaluate("document.documentElement.outerHTML")
        .await
        .map_err(|e| ScrapeError::Transport(e.to_string()))?
        .into_value::<String>()
        .map_err(|_| ScrapeError::ExtractionFailed("failed to read rendered DOM".to_string()))?;

    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .and_then(|s| Url::parse(&s).ok())
        .unwrap_or_else(|| url.clone());

    Ok((html, final_url))
}

/// Fetch `url` with a headless browser: launch, install stealth and
/// interception, navigate, extract the rendered DOM, tear down. On
/// navigation failure, retries against the same generated alternates
/// `fetchWithAlternates` uses, reusing a single browser instance so the
/// 40s phase budget is shared rather than multiplied per attempt.
pub async fn fetch_with_browser(
    url: &Url,
    config: &ScrapeConfig,
    budget: Duration,
) -> Result<FetchOutcome, ScrapeError> {
    let deadline = tokio::time::Instant::now() + budget;

    let launched = launch_browser(&config.user_agent)
        .await
        .map_err(|e| ScrapeError::Transport(e.to_string()))?;

    let result = run_fetch(&launched.browser, url, config, deadline).await;
    shutdown(launched).await;
    result
}

async fn run_fetch(
    browser: &chromiumoxide::Browser,
    url: &Url,
    config: &ScrapeConfig,
    deadline: tokio::time::Instant,
) -> Result<FetchOutcome, ScrapeError> {
    // Primary navigation uses the networkidle-style wait; retries against
    // the generated alternates use the faster domcontentloaded-style wait
    // (spec §4.3), since by the time we're trying alternates the budget is
    // already under pressure and a full settle period per candidate would
    // multiply against it.
    let mut candidates = vec![(url.clone(), WaitMode::NetworkIdle)];
    candidates.extend(
        generate_alternates(url, config.max_alternates)
            .into_iter()
            .map(|alt| (alt, WaitMode::DomContentLoaded)),
    );

    let mut last_err = None;

    for (candidate, wait_mode) in candidates {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Err(ScrapeError::Timeout { phase: FetchPhase::Browser });
        }

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                last_err = Some(ScrapeError::Transport(err.to_string()));
                continue;
            }
        };

        if let Err(err) = stealth::apply(&page, config).await {
            tracing::warn!(%err, "stealth injection failed, proceeding without it");
        }
        if let Err(err) = install_interception(&page).await {
            last_err = Some(ScrapeError::Transport(err.to_string()));
            continue;
        }

        match navigate_and_extract(&page, &candidate, remaining, wait_mode).await {
            Ok((html, final_url)) => {
                if crate::challenge::is_challenge(&html, None, None) {
                    last_err = Some(ScrapeError::BlockedByChallenge {
                        provider: crate::challenge::classify_provider(&html, None, None),
                        domain: final_url.host_str().unwrap_or_default().to_string(),
                    });
                    continue;
                }
                return Ok(FetchOutcome {
                    html,
                    final_url,
                    status_hint: StatusHint::Ok,
                    phase: FetchPhase::Browser,
                });
            }
            Err(err) => {
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or(ScrapeError::AllAlternatesFailed))
}
