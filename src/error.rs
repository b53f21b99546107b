//! Typed error model for the scrape pipeline.

use crate::challenge::ChallengeProvider;
use crate::types::FetchPhase;

/// Errors surfaced by fetchers, the orchestrator, and the extraction stage.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: status {0}")]
    HttpError(u16),

    #[error("response was not HTML (content-type: {0})")]
    NonHtml(String),

    #[error("HTML body exceeded the size cap")]
    OversizeHtml,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{phase:?} phase timed out")]
    Timeout { phase: FetchPhase },

    #[error("blocked by {provider:?} challenge on {domain}")]
    BlockedByChallenge {
        provider: ChallengeProvider,
        domain: String,
    },

    #[error("all alternate URLs failed")]
    AllAlternatesFailed,

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
}

impl ScrapeError {
    /// Whether this failure is a signal to fall through to the next fetch
    /// phase (HTTP -> Browser) rather than a fatal, immediately-terminal error.
    /// Per spec §7's propagation policy, this set is broader than
    /// [`Self::qualifies_for_alternate_race`]: it also includes `NonHtml`
    /// and `Transport`, which the HTTPFetcher's own alternate-race trigger
    /// (§4.2) does not.
    #[must_use]
    pub fn qualifies_for_next_phase(&self) -> bool {
        match self {
            ScrapeError::HttpError(status) => {
                matches!(status, 403 | 406 | 451) || (500..600).contains(status)
            }
            ScrapeError::NonHtml(_) | ScrapeError::Transport(_) | ScrapeError::BlockedByChallenge { .. } => {
                true
            }
            ScrapeError::InvalidUrl(_)
            | ScrapeError::OversizeHtml
            | ScrapeError::Timeout { .. }
            | ScrapeError::AllAlternatesFailed
            | ScrapeError::ExtractionFailed(_) => false,
        }
    }

    /// Whether this failure is one that triggers the HTTPFetcher's
    /// alternate-URL race (spec §4.2): only HTTP 403/406/451, any 5xx, or a
    /// detected challenge. Narrower than [`Self::qualifies_for_next_phase`]
    /// — notably `NonHtml` and `Transport` do *not* trigger alternate
    /// racing, they only trigger the orchestrator's HTTP -> Browser
    /// fallback.
    #[must_use]
    pub fn qualifies_for_alternate_race(&self) -> bool {
        match self {
            ScrapeError::HttpError(status) => {
                matches!(status, 403 | 406 | 451) || (500..600).contains(status)
            }
            ScrapeError::BlockedByChallenge { .. } => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::InvalidUrl(_) | ScrapeError::OversizeHtml)
    }

    /// Whether an HTTPFetcher retry (same URL, exponential backoff) is warranted.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::HttpError(status) if (500..600).contains(status))
    }
}

/// Recommended HTTP status mapping for a gateway translating [`ScrapeError`]
/// into a response code. Not used internally; exposed for callers per spec.
#[must_use]
pub fn recommended_status(err: &ScrapeError) -> u16 {
    match err {
        ScrapeError::InvalidUrl(_) => 400,
        ScrapeError::BlockedByChallenge { .. } => 451,
        ScrapeError::Timeout { .. } => 504,
        _ => 500,
    }
}
