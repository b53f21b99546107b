//! Two-phase fetch: plain HTTP first, headless browser as fallback.

pub mod alternates;
pub mod browser;
pub mod http;

pub use alternates::fetch_with_alternates;
pub use browser::fetch_with_browser;
pub use http::fetch;
