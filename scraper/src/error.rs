//! Error taxonomy for a channel scrape.
//!
//! Credential, quota, and resolution failures abort a run and are surfaced to the caller
//! verbatim. A missing transcript is not an error at all; see [`crate::transcript`].

use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Everything that can abort a scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The channel input could not be parsed or matched to any channel.
    #[error("could not resolve channel: {0}")]
    Resolution(String),

    /// The API key is missing, invalid, or not allowed to use the YouTube Data API.
    #[error("YouTube API rejected the API key: {0}")]
    Auth(String),

    /// The daily quota budget is exhausted, either locally or upstream.
    #[error("YouTube API quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other non-success response from the YouTube API.
    #[error("YouTube API request failed with status {status}: {message}")]
    Api {
        /// HTTP status code of the response
        status: u16,
        /// The error message from the response body, or the raw body
        message: String,
        /// Whether the upstream signalled a temporary condition (5xx, rate limiting)
        transient: bool,
    },

    /// Transport-level failure talking to YouTube.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A response body did not have the expected shape.
    #[error("could not parse {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Writing the CSV output failed.
    #[error("failed to write CSV output: {0}")]
    Export(#[from] csv::Error),
}

impl ScrapeError {
    /// Wraps an I/O failure on the output path as an export error.
    pub fn export_io(e: std::io::Error) -> Self {
        ScrapeError::Export(csv::Error::from(e))
    }
}
