/// Smoke-test for `BrowserListingSource`.
///
/// Launches a headless Chromium, renders page 1 of the given listing URL
/// template and prints every listing found with the default selectors.
///
/// Run with:
///   cargo run --example browser_smoke --features browser -- 'https://example.com/offers#page={page}'
use std::time::Duration;

use roomwatch_client::{BrowserListingSource, ListingSelectors, ListingTarget, PageLocator};
use roomwatch_core::traits::{PageFetcher, PageFetcherFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let template = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: browser_smoke <url-template-with-{{page}}>"))?;

    let target = ListingTarget::new(PageLocator::new(template)?, &ListingSelectors::default())?;
    let source =
        BrowserListingSource::new(target, Duration::from_secs(30), Duration::from_secs(3));

    println!("Launching headless browser…");
    let pages = source.open().await?;
    let entries = pages.fetch_page(1).await?;

    println!("OK: {} listings on page 1", entries.len());
    for entry in entries {
        println!("- {entry}");
    }
    Ok(())
}
