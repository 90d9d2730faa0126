//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{CycleReport, EntryIdentity};
use crate::monitor::{MonitorEvent, MonitorReporter};
use crate::traits::{Fetcher, PageFetcher, PageFetcherFactory};

/// Build an identity from a literal, panicking on empty input.
pub fn entry(raw: &str) -> EntryIdentity {
    EntryIdentity::new(raw).expect("test entry must not be empty")
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock HTML fetcher returning a fixed document per URL.
#[derive(Clone, Default)]
pub struct MockFetcher {
    documents: Arc<Mutex<HashMap<String, Result<String, String>>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, url: &str, html: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(html.to_string()));
        self
    }

    /// Respond to `url` with an `HttpError` carrying `message`.
    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(message.to_string()));
        self
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.documents.lock().unwrap().get(url) {
            Some(Ok(html)) => Ok(html.clone()),
            Some(Err(message)) => Err(AppError::HttpError(message.clone())),
            None => Err(AppError::HttpError(format!("HTTP 404 for {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

/// Builds the error a scripted page fails with.
pub type ErrorFn = Arc<dyn Fn() -> AppError + Send + Sync>;

#[derive(Clone)]
enum ScriptedPage {
    Entries(Vec<EntryIdentity>),
    Error(ErrorFn),
}

/// Mock page fetcher with a configurable result per page index.
///
/// Pages without a configured result return no entries.
#[derive(Clone, Default)]
pub struct MockPageFetcher {
    pages: Arc<Mutex<HashMap<u32, ScriptedPage>>>,
    delays: Arc<Mutex<HashMap<u32, Duration>>>,
    requested: Arc<Mutex<Vec<u32>>>,
    completed: Arc<Mutex<Vec<u32>>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, page: u32, entries: &[&str]) -> Self {
        let entries = entries.iter().map(|e| entry(e)).collect();
        self.pages
            .lock()
            .unwrap()
            .insert(page, ScriptedPage::Entries(entries));
        self
    }

    /// Fail every request for `page` with the error built by `error`.
    pub fn with_error(
        self,
        page: u32,
        error: impl Fn() -> AppError + Send + Sync + 'static,
    ) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(page, ScriptedPage::Error(Arc::new(error)));
        self
    }

    /// Make every request for `page` take `delay` before it resolves.
    pub fn with_delay(self, page: u32, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(page, delay);
        self
    }

    /// Pages whose fetch ran to completion, in completion order.
    pub fn completed_pages(&self) -> Vec<u32> {
        self.completed.lock().unwrap().clone()
    }

    /// Pages requested so far, in call order.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

impl PageFetcher for MockPageFetcher {
    async fn fetch_page(&self, page: u32) -> Result<Vec<EntryIdentity>, AppError> {
        self.requested.lock().unwrap().push(page);
        let delay = self.delays.lock().unwrap().get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.lock().unwrap().push(page);

        let scripted = self.pages.lock().unwrap().get(&page).cloned();
        match scripted {
            Some(ScriptedPage::Entries(entries)) => Ok(entries),
            Some(ScriptedPage::Error(error)) => Err(error()),
            None => Ok(vec![]),
        }
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcherFactory
// ---------------------------------------------------------------------------

/// Mock factory handing out one queued fetcher (or error) per cycle.
///
/// Once the queue is drained every `open` returns an empty fetcher.
#[derive(Clone, Default)]
pub struct MockPageFetcherFactory {
    cycles: Arc<Mutex<Vec<Result<MockPageFetcher, AppError>>>>,
    pub opened: Arc<Mutex<u32>>,
}

impl MockPageFetcherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the fetcher used by the next cycle.
    pub fn then_fetcher(self, fetcher: MockPageFetcher) -> Self {
        self.cycles.lock().unwrap().push(Ok(fetcher));
        self
    }

    /// Make the next cycle fail to open its fetcher.
    pub fn then_error(self, error: AppError) -> Self {
        self.cycles.lock().unwrap().push(Err(error));
        self
    }
}

impl PageFetcherFactory for MockPageFetcherFactory {
    type Fetcher = MockPageFetcher;

    async fn open(&self) -> Result<MockPageFetcher, AppError> {
        *self.opened.lock().unwrap() += 1;
        let mut cycles = self.cycles.lock().unwrap();
        if cycles.is_empty() {
            Ok(MockPageFetcher::new())
        } else {
            cycles.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Owned copy of a [`MonitorEvent`].
#[derive(Debug, Clone)]
pub enum RecordedEvent {
    Started,
    CycleStarted(u64),
    PageFailed { cycle: u64, page: u32 },
    ChangesReported(CycleReport),
    CycleAborted { cycle: u64, error: String },
    Sleeping,
    Stopped { cycles: u64 },
}

/// Reporter that records every event it receives.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    pub events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Reports delivered for completed cycles, in order.
    pub fn reports(&self) -> Vec<CycleReport> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::ChangesReported(report) => Some(report),
                _ => None,
            })
            .collect()
    }
}

impl MonitorReporter for RecordingReporter {
    fn report(&self, event: MonitorEvent<'_>) {
        let recorded = match event {
            MonitorEvent::Started { .. } => RecordedEvent::Started,
            MonitorEvent::CycleStarted { cycle } => RecordedEvent::CycleStarted(cycle),
            MonitorEvent::PageFailed { cycle, page, .. } => {
                RecordedEvent::PageFailed { cycle, page }
            }
            MonitorEvent::ChangesReported { report } => {
                RecordedEvent::ChangesReported(report.clone())
            }
            MonitorEvent::CycleAborted { cycle, error } => RecordedEvent::CycleAborted {
                cycle,
                error: error.to_string(),
            },
            MonitorEvent::Sleeping { .. } => RecordedEvent::Sleeping,
            MonitorEvent::Stopped { cycles } => RecordedEvent::Stopped { cycles },
        };
        self.events.lock().unwrap().push(recorded);
    }
}
