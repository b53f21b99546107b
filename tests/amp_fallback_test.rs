//! Spec §8 fixture scenario 2: a primary URL returning a Cloudflare-style
//! 403 should fail over to its `/amp` alternate.

use article_scrape::{ScrapeConfig, ScrapeOutcome};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn amp_alternate_wins_after_primary_challenge() {
    let mut server = mockito::Server::new_async().await;

    let _primary = server
        .mock("GET", "/articles/one")
        .with_status(403)
        .with_header("content-type", "text/html")
        .with_body("<html><body>Why have I been blocked? Cloudflare Ray ID: abc123</body></html>")
        .create_async()
        .await;

    let _amp = server
        .mock("GET", "/amp/articles/one")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html><head><title>Real Article</title></head>
                <body><p>This is the real article content served from the AMP path.</p></body></html>"#,
        )
        .create_async()
        .await;

    let url = format!("{}/articles/one", server.url());
    let deadline = Instant::now() + Duration::from_secs(10);

    let outcome = article_scrape::scrape_url(&url, deadline, &ScrapeConfig::default())
        .await
        .expect("AMP alternate should rescue the request");

    match outcome {
        ScrapeOutcome::Extracted(result) => {
            assert_eq!(result.title.as_deref(), Some("Real Article"));
            assert!(result.metadata.url.contains("/amp/articles/one"));
        }
        ScrapeOutcome::Blocked(_) => panic!("expected the AMP alternate to succeed, got Blocked"),
    }
}
