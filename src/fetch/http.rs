//! Phase A: plain HTTP fetch with redirect following, size-capped
//! streaming, and status-gated retry.

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::types::{FetchOutcome, FetchPhase, StatusHint};
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

const MAX_RETRIES: u32 = 2;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(5);

fn browser_like_headers(client: reqwest::RequestBuilder, user_agent: &str) -> reqwest::RequestBuilder {
    client
        .header("User-Agent", user_agent)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Accept-Encoding", "gzip, deflate, br")
        .header("Cache-Control", "no-cache")
        .header("Upgrade-Insecure-Requests", "1")
        .header("Referer", "https://www.google.com/")
        .header("Sec-Fetch-Dest", "document")
        .header("Sec-Fetch-Mode", "navigate")
        .header("Sec-Fetch-Site", "none")
        .header("Sec-Fetch-User", "?1")
}

fn build_client(config: &ScrapeConfig) -> Result<Client, ScrapeError> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
        .build()
        .map_err(|e| ScrapeError::Transport(e.to_string()))
}

/// Fetch `url` over plain HTTP, retrying only on 5xx responses with
/// exponential backoff (1s, 2s, ..., capped at 5s), up to two retries.
/// 4xx and transport failures fail immediately without a retry.
pub async fn fetch(url: &Url, config: &ScrapeConfig, budget: Duration) -> Result<FetchOutcome, ScrapeError> {
    let deadline = tokio::time::Instant::now() + budget;
    let client = build_client(config)?;

    let mut attempt = 0u32;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Err(ScrapeError::Timeout { phase: FetchPhase::Http });
        }

        let result = tokio::time::timeout(remaining, fetch_once(&client, url, config)).await;

        match result {
            Ok(Ok(outcome)) => return Ok(outcome),
            Ok(Err(err)) if err.is_retryable() && attempt < MAX_RETRIES => {
                let backoff = (BACKOFF_BASE * 2u32.pow(attempt)).min(BACKOFF_CAP);
                attempt += 1;
                tracing::debug!(%url, attempt, backoff_ms = backoff.as_millis(), %err, "retrying after 5xx");
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining < backoff {
                    return Err(ScrapeError::Timeout { phase: FetchPhase::Http });
                }
                tokio::time::sleep(backoff).await;
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(ScrapeError::Timeout { phase: FetchPhase::Http }),
        }
    }
}

async fn fetch_once(client: &Client, url: &Url, config: &ScrapeConfig) -> Result<FetchOutcome, ScrapeError> {
    let request = browser_like_headers(client.get(url.clone()), &config.user_agent);

    let response = request
        .send()
        .await
        .map_err(|e| ScrapeError::Transport(e.to_string()))?;

    let status = response.status();
    let final_url = response.url().clone();

    if status.is_client_error() {
        return Err(ScrapeError::HttpError(status.as_u16()));
    }
    if status.is_server_error() {
        return Err(ScrapeError::HttpError(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !content_type.to_ascii_lowercase().contains("html") {
        return Err(ScrapeError::NonHtml(content_type));
    }

    let html = stream_body_capped(response, config.max_html_bytes).await?;

    let status_hint = if final_url.as_str() != url.as_str() {
        StatusHint::Redirected
    } else {
        StatusHint::Ok
    };

    Ok(FetchOutcome {
        html,
        final_url,
        status_hint,
        phase: FetchPhase::Http,
    })
}

/// Stream a response body into a `String`, enforcing `max_bytes` before
/// each chunk is accumulated rather than after, so an oversize body never
/// fully lands in memory.
async fn stream_body_capped(response: reqwest::Response, max_bytes: u64) -> Result<String, ScrapeError> {
    let content_length = response.content_length().unwrap_or(0);
    let mut body = Vec::with_capacity((content_length.min(max_bytes)) as usize);

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ScrapeError::Transport(e.to_string()))?;
        if body.len() as u64 + chunk.len() as u64 > max_bytes {
            return Err(ScrapeError::OversizeHtml);
        }
        body.extend_from_slice(&chunk);
    }

    String::from_utf8(body).map_err(|e| ScrapeError::Transport(format!("non-UTF-8 response body: {e}")))
}

/// Whether `status` is one the orchestrator treats as "try the browser phase".
#[must_use]
pub fn status_qualifies_for_fallback(status: StatusCode) -> bool {
    matches!(status.as_u16(), 403 | 406 | 451) || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_qualifies_for_403_406_451_and_5xx() {
        assert!(status_qualifies_for_fallback(StatusCode::FORBIDDEN));
        assert!(status_qualifies_for_fallback(StatusCode::NOT_ACCEPTABLE));
        assert!(status_qualifies_for_fallback(
            StatusCode::from_u16(451).unwrap()
        ));
        assert!(status_qualifies_for_fallback(
            StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert!(!status_qualifies_for_fallback(StatusCode::NOT_FOUND));
    }

    #[test]
    fn retry_classification_only_covers_5xx() {
        assert!(ScrapeError::HttpError(503).is_retryable());
        assert!(!ScrapeError::HttpError(404).is_retryable());
        assert!(!ScrapeError::Transport("boom".into()).is_retryable());
    }
}
