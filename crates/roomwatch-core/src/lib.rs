pub mod aggregate;
pub mod config;
pub mod diff;
pub mod error;
pub mod models;
pub mod monitor;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use aggregate::{Aggregation, PageAggregator, PageOutcome};
pub use config::{MonitorConfig, PageRange};
pub use diff::diff;
pub use error::AppError;
pub use models::{CycleReport, DiffResult, EntryIdentity, Snapshot, compute_hash};
pub use monitor::{
    CycleOutcome, Monitor, MonitorEvent, MonitorReporter, MonitorState, TracingMonitorReporter,
};
pub use traits::{Fetcher, PageFetcher, PageFetcherFactory};
