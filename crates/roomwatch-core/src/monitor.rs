use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::aggregate::{Aggregation, PageAggregator, PageOutcome};
use crate::config::{MonitorConfig, PageRange};
use crate::diff::diff;
use crate::error::AppError;
use crate::models::{CycleReport, Snapshot};
use crate::traits::PageFetcherFactory;

/// Events emitted by the monitor for reporting/logging.
#[derive(Debug, Clone)]
pub enum MonitorEvent<'a> {
    Started {
        pages: PageRange,
        interval: Duration,
    },
    CycleStarted {
        cycle: u64,
    },
    PageFailed {
        cycle: u64,
        page: u32,
        error: &'a AppError,
    },
    /// Emitted exactly once per completed cycle, never for aborted ones.
    ChangesReported {
        report: &'a CycleReport,
    },
    CycleAborted {
        cycle: u64,
        error: &'a AppError,
    },
    Sleeping {
        interval: Duration,
    },
    Stopped {
        cycles: u64,
    },
}

/// Trait for receiving monitor events (decoupled output).
pub trait MonitorReporter: Send + Sync {
    fn report(&self, event: MonitorEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitorReporter;

impl MonitorReporter for TracingMonitorReporter {
    fn report(&self, event: MonitorEvent<'_>) {
        match event {
            MonitorEvent::Started { pages, interval } => {
                tracing::info!(
                    start_page = pages.start(),
                    end_page = pages.end(),
                    interval_secs = interval.as_secs(),
                    "Monitor started"
                );
            }
            MonitorEvent::CycleStarted { cycle } => {
                tracing::info!(%cycle, "Starting monitoring cycle");
            }
            MonitorEvent::PageFailed { cycle, page, error } => {
                tracing::warn!(%cycle, %page, %error, "Page skipped");
            }
            MonitorEvent::ChangesReported { report } => {
                tracing::info!(
                    cycle = report.cycle,
                    entries = report.entry_count,
                    added = report.diff.added.len(),
                    removed = report.diff.removed.len(),
                    pages_failed = report.pages_failed,
                    fingerprint = %&report.fingerprint[..8],
                    "Cycle complete"
                );
                for entry in &report.diff.added {
                    tracing::info!("+ {entry}");
                }
                for entry in &report.diff.removed {
                    tracing::info!("- {entry}");
                }
            }
            MonitorEvent::CycleAborted { cycle, error } => {
                tracing::error!(%cycle, %error, "Cycle aborted, keeping previous snapshot");
            }
            MonitorEvent::Sleeping { interval } => {
                tracing::debug!(secs = interval.as_secs(), "Waiting for next cycle");
            }
            MonitorEvent::Stopped { cycles } => {
                tracing::info!(%cycles, "Monitor stopped");
            }
        }
    }
}

/// Whether a previous snapshot is available to diff against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Retained snapshot is empty; the next cycle reports everything as added.
    Initial,
    /// Retained snapshot holds entries from an earlier cycle.
    Steady,
}

/// Result of a single monitoring cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// The fetcher was unusable. The retained snapshot was not touched.
    Aborted { cycle: u64, error: AppError },
}

/// Polls the listing source, diffs each cycle against the previous one and
/// reports the changes.
pub struct Monitor<F: PageFetcherFactory> {
    factory: F,
    config: MonitorConfig,
    retained: Snapshot,
    cycles: u64,
}

impl<F: PageFetcherFactory> Monitor<F> {
    pub fn new(factory: F, config: MonitorConfig) -> Self {
        Self {
            factory,
            config,
            retained: Snapshot::new(),
            cycles: 0,
        }
    }

    pub fn state(&self) -> MonitorState {
        if self.retained.is_empty() {
            MonitorState::Initial
        } else {
            MonitorState::Steady
        }
    }

    /// Snapshot from the last completed cycle.
    pub fn retained(&self) -> &Snapshot {
        &self.retained
    }

    /// Number of cycles started so far, aborted ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run the monitor loop until cancellation or until `max_cycles` is reached.
    ///
    /// No cycle failure ends the loop. Aborted cycles wait the full interval
    /// like any other.
    pub async fn run<R: MonitorReporter>(&mut self, cancel_token: CancellationToken, reporter: &R) {
        reporter.report(MonitorEvent::Started {
            pages: self.config.pages,
            interval: self.config.interval,
        });

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = self.run_cycle(reporter) => {}
                () = cancel_token.cancelled() => break,
            }

            if self.config.max_cycles.is_some_and(|max| self.cycles >= max) {
                break;
            }

            reporter.report(MonitorEvent::Sleeping {
                interval: self.config.interval,
            });
            tokio::select! {
                () = tokio::time::sleep(self.config.interval) => {}
                () = cancel_token.cancelled() => break,
            }
        }

        reporter.report(MonitorEvent::Stopped {
            cycles: self.cycles,
        });
    }

    /// Run one cycle: aggregate, diff, replace the retained snapshot, report.
    pub async fn run_cycle<R: MonitorReporter>(&mut self, reporter: &R) -> CycleOutcome {
        self.cycles += 1;
        let cycle = self.cycles;
        let started_at = Utc::now();
        reporter.report(MonitorEvent::CycleStarted { cycle });

        let aggregation = match self.aggregate().await {
            Ok(aggregation) => aggregation,
            Err(error) => {
                reporter.report(MonitorEvent::CycleAborted {
                    cycle,
                    error: &error,
                });
                return CycleOutcome::Aborted { cycle, error };
            }
        };

        for outcome in &aggregation.pages {
            if let PageOutcome::Failed { page, error } = outcome {
                reporter.report(MonitorEvent::PageFailed {
                    cycle,
                    page: *page,
                    error,
                });
            }
        }

        let pages_failed = aggregation.failed_count();
        let pages_requested = aggregation.pages.len();
        let snapshot = aggregation.snapshot;

        let report = CycleReport {
            cycle,
            started_at,
            finished_at: Utc::now(),
            pages_requested,
            pages_failed,
            entry_count: snapshot.len(),
            fingerprint: snapshot.fingerprint(),
            diff: diff(&self.retained, &snapshot),
        };
        self.retained = snapshot;

        reporter.report(MonitorEvent::ChangesReported { report: &report });
        CycleOutcome::Completed(report)
    }

    /// Open a fetcher for this cycle and collect the snapshot.
    ///
    /// Failing to open is always fatal, whatever error the factory returns.
    pub async fn aggregate(&self) -> Result<Aggregation, AppError> {
        let fetcher = self.factory.open().await.map_err(|e| {
            if e.is_fatal() {
                e
            } else {
                AppError::FetcherUnavailable(e.to_string())
            }
        })?;

        PageAggregator::new(fetcher, self.config.pages)
            .with_concurrency(self.config.concurrency)
            .collect()
            .await
    }
}
