//! `scrape-url` — a thin CLI around the scrape pipeline.
//!
//! Prints the resulting `ExtractResult`/`BlockedResult` as JSON to stdout,
//! standing in for the HTTP gateway the design treats as an external
//! collaborator (spec §6).

use article_scrape::{recommended_status, ScrapeConfig};
use std::process::ExitCode;
use std::time::Duration;
use tokio::time::Instant;

fn print_usage(program: &str) {
    eprintln!("usage: {program} <url> [timeout_ms]");
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "scrape-url".to_string());

    let Some(url) = args.next() else {
        print_usage(&program);
        return ExitCode::FAILURE;
    };

    let timeout_ms: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60_000);

    let config = ScrapeConfig::from_env();
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    match article_scrape::scrape_url(&url, deadline, &config).await {
        Ok(article_scrape::ScrapeOutcome::Extracted(result)) => match serde_json::to_string_pretty(&result) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                tracing::error!(%err, "failed to serialize extract result");
                ExitCode::FAILURE
            }
        },
        Ok(article_scrape::ScrapeOutcome::Blocked(blocked)) => {
            match serde_json::to_string_pretty(&blocked) {
                Ok(json) => println!("{json}"),
                Err(err) => tracing::error!(%err, "failed to serialize blocked result"),
            }
            // A distinct nonzero exit code; the HTTP status mapping for
            // BlockedByChallenge (451, per spec §7) is the gateway's concern.
            ExitCode::from(2u8)
        }
        Err(err) => {
            let status = recommended_status(&err);
            tracing::error!(%err, status, "scrape failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
