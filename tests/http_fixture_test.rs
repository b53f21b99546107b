//! Fixture-scenario tests against a local mock HTTP server (spec §8),
//! exercising the full `scrape` pipeline's Phase A path without a real
//! network or a headless browser.

use article_scrape::{ScrapeConfig, ScrapeOutcome};
use std::time::Duration;
use tokio::time::Instant;

fn config() -> ScrapeConfig {
    ScrapeConfig::default().with_image_count_cap(3)
}

#[tokio::test]
async fn static_html_happy_path() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/article")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html><head><title>Hello</title>
                <meta property="og:description" content="desc"/>
            </head><body><p>Body paragraph one.</p></body></html>"#,
        )
        .create_async()
        .await;

    let url = format!("{}/article", server.url());
    let deadline = Instant::now() + Duration::from_secs(5);

    let outcome = article_scrape::scrape_url(&url, deadline, &config())
        .await
        .expect("scrape should succeed");

    match outcome {
        ScrapeOutcome::Extracted(result) => {
            assert_eq!(result.title.as_deref(), Some("Hello"));
            assert_eq!(result.description.as_deref(), Some("desc"));
            assert_eq!(result.content.as_deref(), Some("Body paragraph one."));
            assert!(result.images.is_empty());
            assert!(result.metadata.duration_ms < 5_000);
        }
        ScrapeOutcome::Blocked(_) => panic!("expected an extracted result, got a BlockedResult"),
    }
}

#[tokio::test]
async fn non_html_content_type_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/data.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let url = format!("{}/data.json", server.url());
    let deadline = Instant::now() + Duration::from_secs(5);

    // NonHTML does qualify for the orchestrator's HTTP -> Browser fallback
    // (spec §7), but this test only exercises Phase A in isolation, so pin
    // the browser phase's own budget to zero: the orchestrator then
    // surfaces Phase A's NonHtml directly instead of launching a browser
    // this test environment has no guarantee of providing.
    let mut no_browser_phase = config();
    no_browser_phase.browser_phase_budget = Duration::ZERO;

    let err = article_scrape::scrape_url(&url, deadline, &no_browser_phase)
        .await
        .expect_err("non-HTML response should not resolve to a result");
    assert!(matches!(err, article_scrape::ScrapeError::NonHtml(_)));
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_fetch() {
    let deadline = Instant::now() + Duration::from_secs(5);
    let err = article_scrape::scrape_url("not a url", deadline, &config())
        .await
        .expect_err("malformed URL should fail immediately");
    assert!(matches!(err, article_scrape::ScrapeError::InvalidUrl(_)));
}

#[tokio::test]
async fn deadline_enforced_within_small_epsilon() {
    // No server is listening on this port; the connect attempt should
    // exhaust the tiny deadline well before any retry/backoff logic fires.
    let deadline = Instant::now() + Duration::from_millis(500);
    let start = Instant::now();

    let result = article_scrape::scrape_url(
        "http://127.0.0.1:1/unreachable",
        deadline,
        &config(),
    )
    .await;

    assert!(result.is_err());
    assert!(start.elapsed() < Duration::from_millis(3_000));
}
