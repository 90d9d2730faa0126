use thiserror::Error;

/// Application-wide error types for roomwatch.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Page markup could not be interpreted.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A single page could not be fetched or parsed.
    #[error("Page {page} failed: {message}")]
    PageError { page: u32, message: String },

    /// The fetching mechanism itself is unusable (e.g. the browser did not start).
    #[error("Page fetcher unavailable: {0}")]
    FetcherUnavailable(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error invalidates the whole monitoring cycle.
    ///
    /// Everything else is scoped to a single page: the aggregator logs it,
    /// counts the page as empty and moves on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::FetcherUnavailable(_))
    }

    /// Attach a page number to a recoverable error.
    ///
    /// Fatal errors are returned unchanged so they keep aborting the cycle.
    pub fn for_page(self, page: u32) -> Self {
        match self {
            AppError::FetcherUnavailable(_) | AppError::PageError { .. } => self,
            other => AppError::PageError {
                page,
                message: other.to_string(),
            },
        }
    }
}
