use roomwatch_core::error::AppError;
use roomwatch_core::testutil::MockFetcher;
use roomwatch_core::traits::PageFetcher;

use crate::integration::common::{listing_page, page_url, target};

#[tokio::test]
async fn fetch_page_requests_the_templated_url() {
    let fetcher = MockFetcher::new().with_document(
        &page_url(2),
        &listing_page(&[("Cozy flat", "Hauptstr. 1<br>10115 Berlin")]),
    );
    let pages = target().pages(fetcher.clone());

    let entries = pages.fetch_page(2).await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].as_str(), "Cozy flat - Hauptstr. 1, 10115 Berlin");
    assert_eq!(
        *fetcher.requested.lock().unwrap(),
        vec!["https://listings.test/offers?page=2".to_string()]
    );
}

#[tokio::test]
async fn incomplete_listings_never_reach_the_caller() {
    let html = listing_page(&[("Complete", "Street 1"), ("", "Street 2"), ("No address", "")]);
    let fetcher = MockFetcher::new().with_document(&page_url(1), &html);

    let entries = target().pages(fetcher).fetch_page(1).await.unwrap();

    let names: Vec<_> = entries.iter().map(|e| e.as_str()).collect();
    assert_eq!(names, vec!["Complete - Street 1"]);
}

#[tokio::test]
async fn http_failure_becomes_recoverable_page_error() {
    let fetcher = MockFetcher::new().with_failure(&page_url(4), "HTTP 503");

    let err = target().pages(fetcher).fetch_page(4).await.unwrap_err();

    assert!(!err.is_fatal());
    match err {
        AppError::PageError { page, message } => {
            assert_eq!(page, 4);
            assert!(message.contains("HTTP 503"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
