//! Typed errors that callers need to tell apart. Everything else travels as `anyhow::Error`.

use thiserror::Error;

/// Failure to obtain a page from the listing source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid page URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Failure reported by a summarization service.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// The service refused the request because the allowance was exceeded.
    /// This is the only error the summarization stage retries.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Summarization failed: {0}")]
    Failed(String),
}

impl SummarizeError {
    /// Whether the failure is a rate limit and the call may be retried.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SummarizeError::RateLimited(_))
    }
}

/// Errors that halt a pipeline run. Work committed before the error stands.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "Batch {batch} is still rate limited after {attempts} attempts ({summarized} summaries committed before halting)"
    )]
    RetriesExhausted {
        batch: usize,
        attempts: u32,
        summarized: usize,
    },

    #[error("Summarizer returned {actual} summaries for a batch of {expected} texts")]
    SummaryCountMismatch { expected: usize, actual: usize },
}
