//! Runtime configuration for the scrape pipeline.
//!
//! All fields are optional in the sense that [`ScrapeConfig::default`]
//! produces a fully usable configuration; environment variables only
//! override specific knobs, they are never required.

use std::time::Duration;

/// Default Chrome-on-Windows user agent. Kept in sync with the headless
/// browser's major version so servers that sniff the UA see a consistent
/// Chrome build number across the HTTP and browser fetch phases.
///
/// Updated: 2026-07-28. Review alongside the next `chromiumoxide` bump.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

/// Knobs governing the scrape pipeline's network and browser behavior.
///
/// Every field has a sane default; override individual knobs via the
/// `SCRAPE_*` environment variables listed on each field, or by
/// constructing the struct directly for in-process callers (tests,
/// embedders).
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// User-Agent header sent by both fetch phases.
    ///
    /// Env override: `SCRAPE_USER_AGENT`.
    pub user_agent: String,

    /// Maximum number of images returned in [`crate::types::ExtractResult`].
    ///
    /// Env override: `SCRAPE_IMAGE_COUNT_CAP`.
    pub image_count_cap: usize,

    /// Upper bound on the HTTP fetch phase's own budget, before clipping
    /// to the request's remaining deadline.
    ///
    /// Env override: `SCRAPE_HTTP_PHASE_BUDGET_MS`.
    pub http_phase_budget: Duration,

    /// Upper bound on the browser fetch phase's own budget, before
    /// clipping to the request's remaining deadline.
    ///
    /// Env override: `SCRAPE_BROWSER_PHASE_BUDGET_MS`.
    pub browser_phase_budget: Duration,

    /// Time reserved at the tail of the deadline for response assembly,
    /// subtracted before computing a phase's own budget.
    ///
    /// Env override: `SCRAPE_DEADLINE_SAFETY_MARGIN_MS`.
    pub deadline_safety_margin: Duration,

    /// Hard cap on streamed HTML response bodies. Exceeding it fails the
    /// fetch immediately with [`crate::error::ScrapeError::OversizeHtml`],
    /// without a browser-phase retry (see SPEC_FULL.md open question).
    ///
    /// Env override: `SCRAPE_MAX_HTML_BYTES`.
    pub max_html_bytes: u64,

    /// Maximum HTTP redirects followed per fetch.
    ///
    /// Env override: `SCRAPE_MAX_REDIRECTS`.
    pub max_redirects: u8,

    /// Maximum alternate URLs raced concurrently by `fetchWithAlternates`.
    pub max_alternates: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            image_count_cap: 3,
            http_phase_budget: Duration::from_secs(18),
            browser_phase_budget: Duration::from_secs(40),
            deadline_safety_margin: Duration::from_secs(3),
            max_html_bytes: 6 * 1024 * 1024,
            max_redirects: 5,
            max_alternates: 4,
        }
    }
}

impl ScrapeConfig {
    /// Build a config from defaults overridden by any `SCRAPE_*`
    /// environment variables that are set and parse cleanly. A malformed
    /// value is logged and ignored rather than treated as fatal.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ua) = std::env::var("SCRAPE_USER_AGENT") {
            if !ua.is_empty() {
                config.user_agent = ua;
            }
        }

        if let Some(value) = parse_env_u64("SCRAPE_IMAGE_COUNT_CAP") {
            config.image_count_cap = value as usize;
        }
        if let Some(value) = parse_env_u64("SCRAPE_HTTP_PHASE_BUDGET_MS") {
            config.http_phase_budget = Duration::from_millis(value);
        }
        if let Some(value) = parse_env_u64("SCRAPE_BROWSER_PHASE_BUDGET_MS") {
            config.browser_phase_budget = Duration::from_millis(value);
        }
        if let Some(value) = parse_env_u64("SCRAPE_DEADLINE_SAFETY_MARGIN_MS") {
            config.deadline_safety_margin = Duration::from_millis(value);
        }
        if let Some(value) = parse_env_u64("SCRAPE_MAX_HTML_BYTES") {
            config.max_html_bytes = value;
        }
        if let Some(value) = parse_env_u64("SCRAPE_MAX_REDIRECTS") {
            config.max_redirects = value as u8;
        }

        config
    }

    #[must_use]
    pub fn with_image_count_cap(mut self, cap: usize) -> Self {
        self.image_count_cap = cap;
        self
    }
}

fn parse_env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| {
        let parsed = v.parse().ok();
        if parsed.is_none() {
            tracing::warn!(key, value = %v, "ignoring unparsable scrape config override");
        }
        parsed
    })
}
