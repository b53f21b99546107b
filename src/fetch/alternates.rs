//! Concurrent alternate-URL racing: when the primary fetch hits a
//! qualifying failure, fan out to AMP/mobile variants and take the first
//! non-challenged success.

use crate::challenge::is_challenge;
use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::fetch::http;
use crate::types::FetchOutcome;
use crate::urls::generate_alternates;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Fetch `url` and, if the primary attempt fails in a way that qualifies
/// for fallback (see [`crate::error::ScrapeError::qualifies_for_alternate_race`]),
/// race its generated alternates concurrently. The first alternate to
/// return a non-challenged success wins; the rest are dropped (their
/// tasks keep running to completion in the background but their results
/// are discarded — `reqwest` has no native cancel-on-drop for an
/// in-flight request future once spawned, so we simply stop polling it).
///
/// `budget` is the *entire* phase's budget, shared by the primary attempt
/// and the alternate race that may follow it: a single `deadline` is
/// derived once, up front, and both the primary fetch and every alternate
/// are given only the time remaining until that deadline, never the full
/// `budget` twice over (spec §4.1's single per-phase budget).
///
/// Returns [`ScrapeError::AllAlternatesFailed`] only if the primary and
/// every alternate failed.
pub async fn fetch_with_alternates(
    url: &Url,
    config: &ScrapeConfig,
    budget: Duration,
) -> Result<FetchOutcome, ScrapeError> {
    let deadline = tokio::time::Instant::now() + budget;

    let primary = http::fetch(url, config, budget).await;

    let primary_challenge_err = match primary {
        Ok(outcome) => {
            if is_challenge(&outcome.html, None, None) {
                tracing::info!(url = %url, "primary fetch detected as a challenge page, racing alternates");
                ScrapeError::BlockedByChallenge {
                    provider: crate::challenge::classify_provider(&outcome.html, None, None),
                    domain: outcome.final_url.host_str().unwrap_or_default().to_string(),
                }
            } else {
                return Ok(outcome);
            }
        }
        Err(err) if !err.qualifies_for_alternate_race() => return Err(err),
        Err(err) => return race_alternates(url, config, deadline, Some(err)).await,
    };

    // Primary looked like a challenge: race alternates, but never surface
    // the challenged page itself as a successful outcome (it must never
    // reach extraction — see the "never returns the challenged page as
    // content" invariant).
    race_alternates(url, config, deadline, Some(primary_challenge_err)).await
}

async fn race_alternates(
    url: &Url,
    config: &ScrapeConfig,
    deadline: tokio::time::Instant,
    primary_err: Option<ScrapeError>,
) -> Result<FetchOutcome, ScrapeError> {
    let alternates = generate_alternates(url, config.max_alternates);
    if alternates.is_empty() {
        return Err(primary_err.unwrap_or(ScrapeError::AllAlternatesFailed));
    }

    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
    if remaining.is_zero() {
        return Err(primary_err.unwrap_or(ScrapeError::AllAlternatesFailed));
    }

    let (tx, mut rx) = mpsc::channel::<Result<FetchOutcome, ScrapeError>>(alternates.len());

    for alternate in alternates.clone() {
        let tx = tx.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let result = http::fetch(&alternate, &config, remaining).await;
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut pending = alternates.len();
    let mut last_err = primary_err;

    while pending > 0 {
        match rx.recv().await {
            Some(Ok(outcome)) if !is_challenge(&outcome.html, None, None) => return Ok(outcome),
            Some(Ok(outcome)) => {
                last_err = Some(ScrapeError::BlockedByChallenge {
                    provider: crate::challenge::classify_provider(&outcome.html, None, None),
                    domain: outcome.final_url.host_str().unwrap_or_default().to_string(),
                });
                pending -= 1;
            }
            Some(Err(err)) => {
                last_err = Some(err);
                pending -= 1;
            }
            None => break,
        }
    }

    Err(last_err.unwrap_or(ScrapeError::AllAlternatesFailed))
}
