use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use futures::{future, stream};

use crate::config::PageRange;
use crate::error::AppError;
use crate::models::Snapshot;
use crate::traits::PageFetcher;

/// What happened to a single page during aggregation.
#[derive(Debug)]
pub enum PageOutcome {
    Fetched { page: u32, entries: usize },
    Failed { page: u32, error: AppError },
}

impl PageOutcome {
    pub fn page(&self) -> u32 {
        match self {
            PageOutcome::Fetched { page, .. } | PageOutcome::Failed { page, .. } => *page,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PageOutcome::Failed { .. })
    }
}

/// Result of one successful (possibly partial) pass over the page range.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub snapshot: Snapshot,
    /// One outcome per page, in ascending page order.
    pub pages: Vec<PageOutcome>,
}

impl Aggregation {
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageOutcome> {
        self.pages.iter().filter(|p| p.is_failed())
    }

    pub fn failed_count(&self) -> usize {
        self.failed_pages().count()
    }
}

/// Runs a [`PageFetcher`] over a page range and merges the results into one snapshot.
///
/// Recoverable page errors are isolated: the page contributes nothing and the
/// remaining pages are still fetched. A fatal error abandons the pass.
pub struct PageAggregator<P: PageFetcher> {
    fetcher: P,
    range: PageRange,
    concurrency: usize,
}

impl<P: PageFetcher> PageAggregator<P> {
    /// Sequential aggregator: one page at a time, ascending.
    pub fn new(fetcher: P, range: PageRange) -> Self {
        Self {
            fetcher,
            range,
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` page fetches in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch every page in the range and build the cycle snapshot.
    ///
    /// Results are consumed in page order and the snapshot is only handed
    /// out once every page has settled. After a fatal error no further pages
    /// are started, but fetches already in flight run to completion before
    /// the error is returned.
    pub async fn collect(&self) -> Result<Aggregation, AppError> {
        let fetcher = &self.fetcher;
        let aborted = AtomicBool::new(false);
        let aborted = &aborted;

        tracing::debug!(
            pages = self.range.page_count(),
            concurrency = self.concurrency,
            "Starting page pass"
        );

        let mut results = stream::iter(self.range.pages())
            .take_while(|_| future::ready(!aborted.load(Ordering::SeqCst)))
            .map(|page| async move {
                tracing::debug!(%page, "Fetching page");
                (page, fetcher.fetch_page(page).await)
            })
            .buffered(self.concurrency);

        let mut aggregation = Aggregation::default();
        let mut fatal: Option<AppError> = None;

        while let Some((page, result)) = results.next().await {
            if fatal.is_some() {
                tracing::debug!(%page, ok = result.is_ok(), "Page settled after fatal error");
                continue;
            }
            match result {
                Ok(entries) => {
                    tracing::debug!(%page, entries = entries.len(), "Page fetched");
                    aggregation.pages.push(PageOutcome::Fetched {
                        page,
                        entries: entries.len(),
                    });
                    aggregation.snapshot.extend(entries);
                }
                Err(e) if e.is_fatal() => {
                    tracing::debug!(%page, error = %e, "Fatal fetcher error, abandoning pass");
                    aborted.store(true, Ordering::SeqCst);
                    fatal = Some(e);
                }
                Err(e) => {
                    aggregation.pages.push(PageOutcome::Failed {
                        page,
                        error: e.for_page(page),
                    });
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(aggregation),
        }
    }
}
