use std::time::Duration;

use roomwatch_core::monitor::{CycleOutcome, Monitor};
use roomwatch_core::testutil::RecordingReporter;
use roomwatch_core::{CycleReport, MonitorConfig, PageRange};

use crate::integration::common::StaticSource;

fn config() -> MonitorConfig {
    MonitorConfig::default()
        .with_pages(PageRange::new(1, 3).unwrap())
        .with_interval(Duration::from_secs(60))
}

fn completed(outcome: CycleOutcome) -> CycleReport {
    match outcome {
        CycleOutcome::Completed(report) => report,
        CycleOutcome::Aborted { error, .. } => panic!("cycle aborted: {error}"),
    }
}

fn added(report: &CycleReport) -> Vec<&str> {
    report.diff.added.iter().map(|e| e.as_str()).collect()
}

fn removed(report: &CycleReport) -> Vec<&str> {
    report.diff.removed.iter().map(|e| e.as_str()).collect()
}

#[tokio::test]
async fn tracks_listings_across_cycles() {
    let source = StaticSource::new();
    let reporter = RecordingReporter::new();
    let mut monitor = Monitor::new(source.clone(), config());

    source.serve_page(1, &[("A", "Addr1")]);
    source.serve_page(2, &[("B", "Addr2")]);
    source.serve_page(3, &[]);
    let first = completed(monitor.run_cycle(&reporter).await);
    assert_eq!(added(&first), vec!["A - Addr1", "B - Addr2"]);
    assert!(first.diff.removed.is_empty());

    source.clear();
    source.serve_page(1, &[("B", "Addr2")]);
    source.serve_page(2, &[("C", "Addr3")]);
    source.serve_page(3, &[]);
    let second = completed(monitor.run_cycle(&reporter).await);
    assert_eq!(added(&second), vec!["C - Addr3"]);
    assert_eq!(removed(&second), vec!["A - Addr1"]);

    let third = completed(monitor.run_cycle(&reporter).await);
    assert!(!third.diff.has_changes());
    assert_eq!(reporter.reports().len(), 3);
}

#[tokio::test]
async fn missing_page_does_not_hide_other_pages() {
    let source = StaticSource::new();
    let mut monitor = Monitor::new(source.clone(), config());

    // Page 2 is not served and answers 404.
    source.serve_page(1, &[("A", "Addr1")]);
    source.serve_page(3, &[("C", "Addr3")]);
    let report = completed(monitor.run_cycle(&RecordingReporter::new()).await);

    assert_eq!(report.pages_failed, 1);
    assert_eq!(added(&report), vec!["A - Addr1", "C - Addr3"]);
}

#[tokio::test]
async fn browser_failure_does_not_report_mass_removal() {
    let source = StaticSource::new();
    let reporter = RecordingReporter::new();
    let mut monitor = Monitor::new(source.clone(), config());

    source.serve_page(1, &[("A", "Addr1"), ("B", "Addr2")]);
    source.serve_page(2, &[]);
    source.serve_page(3, &[]);
    completed(monitor.run_cycle(&reporter).await);
    let before = monitor.retained().clone();

    source.fail_next_open();
    let outcome = monitor.run_cycle(&reporter).await;
    assert!(matches!(outcome, CycleOutcome::Aborted { .. }));
    assert_eq!(monitor.retained(), &before);
    assert_eq!(reporter.reports().len(), 1);

    let recovered = completed(monitor.run_cycle(&reporter).await);
    assert!(!recovered.diff.has_changes());
}

#[tokio::test]
async fn concurrent_fetching_matches_sequential() {
    let source = StaticSource::new();
    source.serve_page(1, &[("A", "Addr1")]);
    source.serve_page(2, &[("B", "Addr2"), ("A", "Addr1")]);
    source.serve_page(3, &[("C", "Addr3")]);

    let mut sequential = Monitor::new(source.clone(), config());
    let mut concurrent = Monitor::new(source, config().with_concurrency(3));

    let a = completed(sequential.run_cycle(&RecordingReporter::new()).await);
    let b = completed(concurrent.run_cycle(&RecordingReporter::new()).await);

    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(sequential.retained(), concurrent.retained());
    assert_eq!(b.entry_count, 3);
}
