//! Explicit configuration handed to each stage. Nothing here is read from the environment.

use std::time::Duration;
use url::Url;

/// Where pages come from and how politely they are fetched.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Address of the first page of the listing overview.
    pub listing_url: Url,
    /// Base address that relative detail and article links are resolved against.
    pub base_url: Url,
    /// Pause before every request.
    pub request_delay: Duration,
    /// Upper bound on "load more" pages followed while reading the listing.
    pub max_listing_pages: usize,
}

impl SourceConfig {
    /// Builds a source configuration with the default delay and page limit.
    pub fn new(listing_url: Url, base_url: Url) -> Self {
        Self {
            listing_url,
            base_url,
            request_delay: Duration::from_millis(1000),
            max_listing_pages: 100,
        }
    }
}

/// Budget and retry policy of the summarization stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummarizeConfig {
    /// Character budget of one batch sent to the summarizer.
    pub max_chars_per_batch: usize,
    /// Total attempts per batch while the service keeps signalling a rate limit.
    pub max_retries: u32,
    /// Fixed pause between two attempts of the same batch.
    pub retry_delay: Duration,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            max_chars_per_batch: 12_000,
            max_retries: 6,
            retry_delay: Duration::from_secs(10),
        }
    }
}
