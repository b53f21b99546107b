//! Article-extraction scrape pipeline: given a URL, produce a cleaned
//! title, description, body text, and a small ranked set of
//! representative images, or classify the page as anti-bot-blocked.
//!
//! The crate root wires together the six cooperating components
//! described by the design: [`orchestrator`] (sequencing and deadline
//! enforcement), [`fetch`] (plain-HTTP and headless-browser acquisition),
//! [`challenge`] (anti-bot detection), and [`extract`] (article body and
//! image-candidate mining). [`config`], [`error`], [`types`], and [`urls`]
//! are the shared ambient pieces the rest build on.

pub mod browser_setup;
pub mod challenge;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod orchestrator;
pub mod stealth;
pub mod types;
pub mod urls;

pub use config::ScrapeConfig;
pub use error::{recommended_status, ScrapeError};
pub use orchestrator::{scrape, scrape_url, ScrapeOutcome};
pub use types::{
    BlockedResult, ExtractResult, FetchOutcome, FetchPhase, ImageCandidate, ImageSource,
    ScrapeMetadata, ScrapeRequest, StatusHint,
};
