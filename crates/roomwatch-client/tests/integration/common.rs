use std::sync::{Arc, Mutex};

use roomwatch_client::{ListingPages, ListingSelectors, ListingTarget, PageLocator};
use roomwatch_core::error::AppError;
use roomwatch_core::testutil::MockFetcher;
use roomwatch_core::traits::PageFetcherFactory;

pub const TEMPLATE: &str = "https://listings.test/offers?page={page}";

pub fn page_url(page: u32) -> String {
    TEMPLATE.replace("{page}", &page.to_string())
}

/// Render a results page in the default listing markup.
pub fn listing_page(listings: &[(&str, &str)]) -> String {
    let items: String = listings
        .iter()
        .map(|(name, address)| {
            format!(
                r#"<li class="object-list__item">
                     <h2 class="object-list__headline">{name}</h2>
                     <div class="object-list__address"><p>{address}</p></div>
                   </li>"#
            )
        })
        .collect();
    format!("<html><body><ul class=\"object-list\">{items}</ul></body></html>")
}

pub fn target() -> ListingTarget {
    ListingTarget::new(
        PageLocator::new(TEMPLATE).unwrap(),
        &ListingSelectors::default(),
    )
    .unwrap()
}

/// Factory serving pages from a shared [`MockFetcher`].
///
/// Swap documents between cycles with [`StaticSource::clear`] and
/// [`StaticSource::serve_page`]; make the next
/// `open` fail with [`StaticSource::fail_next_open`].
#[derive(Clone)]
pub struct StaticSource {
    target: ListingTarget,
    fetcher: Arc<Mutex<MockFetcher>>,
    fail_next_open: Arc<Mutex<bool>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self {
            target: target(),
            fetcher: Arc::new(Mutex::new(MockFetcher::new())),
            fail_next_open: Arc::new(Mutex::new(false)),
        }
    }

    /// Stop serving all pages; unknown pages respond with HTTP 404.
    pub fn clear(&self) {
        *self.fetcher.lock().unwrap() = MockFetcher::new();
    }

    pub fn serve_page(&self, page: u32, listings: &[(&str, &str)]) {
        let mut fetcher = self.fetcher.lock().unwrap();
        *fetcher = fetcher
            .clone()
            .with_document(&page_url(page), &listing_page(listings));
    }

    pub fn fail_next_open(&self) {
        *self.fail_next_open.lock().unwrap() = true;
    }
}

impl PageFetcherFactory for StaticSource {
    type Fetcher = ListingPages<MockFetcher>;

    async fn open(&self) -> Result<Self::Fetcher, AppError> {
        let fail = std::mem::take(&mut *self.fail_next_open.lock().unwrap());
        if fail {
            return Err(AppError::FetcherUnavailable("browser did not start".into()));
        }
        let fetcher = self.fetcher.lock().unwrap().clone();
        Ok(self.target.pages(fetcher))
    }
}
