use std::future::Future;

use crate::error::AppError;
use crate::models::EntryIdentity;

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Produces the entries listed on one page of the source.
///
/// Errors are classified with [`AppError::is_fatal`]: a fatal error means the
/// fetching mechanism is unusable and the whole cycle is abandoned, anything
/// else only empties this one page.
pub trait PageFetcher: Send + Sync + Clone {
    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<Vec<EntryIdentity>, AppError>> + Send;
}

/// Opens a [`PageFetcher`] for one monitoring cycle.
///
/// Lets implementations acquire per-cycle resources (an HTTP client, a
/// browser process) and report when they cannot. A failed `open` aborts the
/// cycle.
pub trait PageFetcherFactory: Send + Sync {
    type Fetcher: PageFetcher;

    fn open(&self) -> impl Future<Output = Result<Self::Fetcher, AppError>> + Send;
}
