//! Core data model shared across the scrape pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A request to scrape a single URL, bounded by an absolute deadline.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub url: Url,
    /// Absolute point in time by which the pipeline must have produced a result.
    pub deadline: tokio::time::Instant,
}

impl ScrapeRequest {
    #[must_use]
    pub fn new(url: Url, deadline: tokio::time::Instant) -> Self {
        Self { url, deadline }
    }

    /// Time remaining until `deadline`, zero if already past.
    #[must_use]
    pub fn remaining(&self) -> std::time::Duration {
        self.deadline
            .checked_duration_since(tokio::time::Instant::now())
            .unwrap_or_default()
    }
}

/// Which fetch phase produced a [`FetchOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchPhase {
    Http,
    Browser,
}

/// A hint about why an HTTP response looked unusual, carried alongside a
/// successful fetch so the orchestrator can still reason about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusHint {
    Ok,
    Redirected,
}

/// Successful result of a fetch phase: raw HTML plus enough context to
/// resolve relative URLs and judge whether a retry is worthwhile.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub html: String,
    pub final_url: Url,
    pub status_hint: StatusHint,
    pub phase: FetchPhase,
}

/// Where an image candidate was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSource {
    /// `og:image` / `og:image:secure_url` meta tags.
    Og,
    /// `<img>` element sweep.
    Img,
}

/// A candidate image surfaced during extraction, carrying everything
/// [`crate::extract::images`]'s filter and scoring steps need.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub url: Url,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub in_article_scope: bool,
    pub bad_hint: bool,
    pub source: ImageSource,
    pub score: f64,
    pub area: u64,
}

/// Request-scoped metadata attached to every successful or blocked result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeMetadata {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// A successfully extracted article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResult {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub images: Vec<String>,
    pub metadata: ScrapeMetadata,
}

/// The target responded with an anti-bot challenge instead of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedResult {
    pub provider: String,
    pub domain: String,
    pub metadata: ScrapeMetadata,
}
