use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::AppError;

/// Inclusive range of page indices visited each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::ConfigError(format!(
                "Invalid page range {start}..={end}: start page must not exceed end page"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Page indices in ascending order.
    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    /// Number of pages in the range; never zero.
    pub fn page_count(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self { start: 1, end: 5 }
    }
}

/// Configuration for the monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub pages: PageRange,
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Maximum number of pages fetched at the same time.
    pub concurrency: usize,
    /// Stop after this many cycles. `None` runs until cancelled.
    pub max_cycles: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pages: PageRange::default(),
            interval: Duration::from_secs(60),
            concurrency: 1,
            max_cycles: None,
        }
    }
}

impl MonitorConfig {
    pub fn with_pages(mut self, pages: PageRange) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.interval.is_zero() {
            return Err(AppError::ConfigError(
                "Polling interval must be greater than zero".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(AppError::ConfigError(
                "Concurrency must be at least 1".into(),
            ));
        }
        if self.max_cycles == Some(0) {
            return Err(AppError::ConfigError(
                "Cycle limit must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}
