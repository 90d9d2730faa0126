#[cfg(feature = "browser")]
pub mod browser_fetcher;
pub mod extractor;
pub mod fetcher;
pub mod listing;

#[cfg(feature = "browser")]
pub use browser_fetcher::BrowserFetcher;
pub use extractor::{ListingExtractor, ListingSelectors};
pub use fetcher::ReqwestFetcher;
#[cfg(feature = "browser")]
pub use listing::BrowserListingSource;
pub use listing::{HttpListingSource, ListingPages, ListingTarget, PageLocator};
