//! Runs the three stages back to back against one store.

use anyhow::Result;
use log::info;

use crate::acquire::acquire_pending;
use crate::config::SummarizeConfig;
use crate::discover::run_discovery;
use crate::fetch::PageFetcher;
use crate::report::StageReport;
use crate::storage::Storage;
use crate::summarize::{Summarizer, summarize_new};

/// Runs discovery, acquisition and summarization in order.
///
/// Each finished stage's report is pushed onto `reports` before the next
/// stage starts, so the counts of completed stages survive a halted run.
///
/// # Errors
///
/// Returns the first stage error; later stages are not started
pub async fn run_pipeline<F: PageFetcher, S: Summarizer>(
    storage: &Storage,
    fetcher: &F,
    summarizer: &S,
    config: &SummarizeConfig,
    reports: &mut Vec<StageReport>,
) -> Result<()> {
    reports.push(run_discovery(storage, fetcher).await?);
    reports.push(acquire_pending(storage, fetcher).await?);
    reports.push(summarize_new(storage, summarizer, config).await?);

    info!("Pipeline finished");
    Ok(())
}
