use std::sync::Arc;
use std::time::Duration;

use roomwatch_core::error::AppError;
use roomwatch_core::models::EntryIdentity;
use roomwatch_core::traits::{Fetcher, PageFetcher, PageFetcherFactory};
use url::Url;

use crate::extractor::{ListingExtractor, ListingSelectors};
use crate::fetcher::ReqwestFetcher;

/// Placeholder replaced by the page number in a locator template.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// URL template for the pages of a listing source.
///
/// Example: `https://example.com/offers?page={page}&city=Berlin`.
#[derive(Debug, Clone)]
pub struct PageLocator {
    template: String,
}

impl PageLocator {
    pub fn new(template: impl Into<String>) -> Result<Self, AppError> {
        let template = template.into();
        if !template.contains(PAGE_PLACEHOLDER) {
            return Err(AppError::ConfigError(format!(
                "URL template '{template}' has no {PAGE_PLACEHOLDER} placeholder"
            )));
        }

        let sample = template.replace(PAGE_PLACEHOLDER, "1");
        let parsed = Url::parse(&sample)
            .map_err(|e| AppError::ConfigError(format!("Invalid URL template '{template}': {e}")))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(AppError::ConfigError(format!(
                    "URL scheme '{scheme}' is not allowed (only http/https)"
                )));
            }
        }

        Ok(Self { template })
    }

    pub fn url(&self, page: u32) -> String {
        self.template.replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Where the listings live and how to read them.
#[derive(Debug, Clone)]
pub struct ListingTarget {
    locator: Arc<PageLocator>,
    extractor: Arc<ListingExtractor>,
}

impl ListingTarget {
    pub fn new(locator: PageLocator, selectors: &ListingSelectors) -> Result<Self, AppError> {
        Ok(Self {
            locator: Arc::new(locator),
            extractor: Arc::new(ListingExtractor::new(selectors)?),
        })
    }

    pub fn locator(&self) -> &PageLocator {
        &self.locator
    }

    /// Bind this target to an HTML fetcher.
    pub fn pages<F: Fetcher>(&self, fetcher: F) -> ListingPages<F> {
        ListingPages {
            fetcher,
            target: self.clone(),
        }
    }
}

/// [`PageFetcher`] that downloads a page through any [`Fetcher`] and
/// extracts its listings.
#[derive(Clone)]
pub struct ListingPages<F: Fetcher> {
    fetcher: F,
    target: ListingTarget,
}

impl<F: Fetcher> PageFetcher for ListingPages<F> {
    async fn fetch_page(&self, page: u32) -> Result<Vec<EntryIdentity>, AppError> {
        let url = self.target.locator.url(page);
        tracing::info!(%page, "Scraping {}", url);

        let html = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| e.for_page(page))?;

        let entries = self.target.extractor.extract(&html);
        tracing::debug!(%page, entries = entries.len(), "Extracted listings");
        Ok(entries)
    }
}

/// Per-cycle factory backed by a plain HTTP client.
#[derive(Debug, Clone)]
pub struct HttpListingSource {
    target: ListingTarget,
    timeout: Duration,
}

impl HttpListingSource {
    pub fn new(target: ListingTarget, timeout: Duration) -> Self {
        Self { target, timeout }
    }
}

impl PageFetcherFactory for HttpListingSource {
    type Fetcher = ListingPages<ReqwestFetcher>;

    async fn open(&self) -> Result<Self::Fetcher, AppError> {
        let fetcher = ReqwestFetcher::with_timeout(self.timeout)?;
        Ok(self.target.pages(fetcher))
    }
}

/// Per-cycle factory that launches a fresh headless browser for each cycle.
///
/// A browser that cannot start makes the cycle abort.
#[cfg(feature = "browser")]
#[derive(Debug, Clone)]
pub struct BrowserListingSource {
    target: ListingTarget,
    timeout: Duration,
    render_wait: Duration,
}

#[cfg(feature = "browser")]
impl BrowserListingSource {
    pub fn new(target: ListingTarget, timeout: Duration, render_wait: Duration) -> Self {
        Self {
            target,
            timeout,
            render_wait,
        }
    }
}

#[cfg(feature = "browser")]
impl PageFetcherFactory for BrowserListingSource {
    type Fetcher = ListingPages<crate::BrowserFetcher>;

    async fn open(&self) -> Result<Self::Fetcher, AppError> {
        tracing::debug!("Launching headless browser");
        let fetcher = crate::BrowserFetcher::launch(self.timeout, self.render_wait).await?;
        Ok(self.target.pages(fetcher))
    }
}
