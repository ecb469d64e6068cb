//! The tablescout library ingests restaurant listings, detail pages and related
//! articles into a local database and summarizes the collected content with an LLM.
//!
//! The pipeline has three stages, each an idempotent pass over [`storage::Storage`]:
//! 1. [`discover`](discover::run_discovery) stores new, open listings
//! 2. [`acquire`](acquire::acquire_pending) stores a record and content documents per listing
//! 3. [`summarize`](summarize::summarize_new) stores one summary per restaurant

pub mod acquire;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod discover;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod summarize;

pub use acquire::{acquire_details, acquire_pending};
pub use chunk::partition;
pub use config::{SourceConfig, SummarizeConfig};
pub use discover::{discover, run_discovery};
pub use error::{FetchError, PipelineError, SummarizeError};
pub use fetch::{HttpFetcher, PageFetcher};
pub use pipeline::run_pipeline;
pub use report::StageReport;
pub use storage::Storage;
pub use summarize::{Summarizer, run_summarization, summarize_new};
