//! The summarize module turns the stored content of every restaurant without a
//! summary into one summary, batch by batch, and stores the results.

use anyhow::{Context, Result};
use llm::LLMProvider;
use llm::builder::LLMBuilder;
use llm::chat::{ChatMessage, ChatMessageBuilder, ChatProvider};
use llm::error::LLMError;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::time::Duration;

use crate::chunk::partition;
use crate::config::SummarizeConfig;
use crate::constants::{DEFAULT_PROMPT_TEMPLATE, RATE_LIMIT_MARKER, THINK_STRIPPER};
use crate::error::{PipelineError, SummarizeError};
use crate::report::StageReport;
use crate::storage::Storage;

use rate_guard::{RateLimit, StdTokenBucket, TokenBucketBuilder};

static THINK_STRIPPER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(THINK_STRIPPER).expect("Failed to compile THINK_STRIPPER regex"));

static RATE_LIMIT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(RATE_LIMIT_MARKER).expect("Failed to compile RATE_LIMIT_MARKER regex")
});

/// A text-generation service that summarizes texts in batches.
pub trait Summarizer {
    /// Returns one summary per text, in the same order.
    fn summarize_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<String>, SummarizeError>>;
}

/// Configuration containing shared data for LLM summarization
pub struct SummarizeContext<'a> {
    /// LLM model to use for summarization
    pub model: &'a dyn ChatProvider,
    /// Prompt template to use
    pub prompt_template: Option<&'a str>,
    /// Rate limiter for controlling request frequency
    pub rate_limiter: Option<&'a StdTokenBucket>,
}

impl Summarizer for SummarizeContext<'_> {
    async fn summarize_batch(&self, texts: &[String]) -> Result<Vec<String>, SummarizeError> {
        let mut summaries = Vec::with_capacity(texts.len());
        for text in texts {
            summaries.push(summarize_text(text, self).await?);
        }

        Ok(summaries)
    }
}

/// Builds a token bucket allowing `rpm` requests per minute.
pub fn build_rate_limiter(rpm: u32) -> Option<StdTokenBucket> {
    let capacity = u64::from(rpm.max(1));
    let refill_interval = Duration::from_secs_f64(60.0 / capacity as f64);

    TokenBucketBuilder::builder()
        .capacity(capacity)
        .refill_amount(1_u64)
        .refill_every(refill_interval)
        .with_time(rate_guard::StdTimeSource::new())
        .with_precision::<rate_guard::Nanos>()
        .build()
        .ok()
}

/// Summarizes a single text with an LLM model.
///
/// Reasoning blocks (`<think>…</think>`) are stripped from the reply.
///
/// # Errors
///
/// Returns [`SummarizeError::RateLimited`] if the provider reports a rate limit,
/// [`SummarizeError::Failed`] for any other provider error
pub async fn summarize_text(
    text: &str,
    ctx: &SummarizeContext<'_>,
) -> Result<String, SummarizeError> {
    let prompt_template = ctx.prompt_template.unwrap_or(DEFAULT_PROMPT_TEMPLATE);
    let prompt = prompt_template.replace("{text}", text);

    let mut messages: Vec<ChatMessageBuilder> = vec![ChatMessage::user().content(prompt)];

    if !prompt_template.contains("{text}") {
        messages.push(ChatMessage::user().content(text));
    }

    let messages: Vec<ChatMessage> = messages
        .into_iter()
        .map(|message| message.build())
        .collect();

    if let Some(limiter) = ctx.rate_limiter {
        while limiter.try_acquire(1).is_err() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    let response = ctx
        .model
        .chat(&messages)
        .await
        .map_err(classify_llm_error)?
        .to_string();

    let summary = THINK_STRIPPER_REGEX
        .replace_all(&response, "")
        .to_string()
        .trim()
        .to_owned();

    Ok(summary)
}

fn classify_llm_error(err: LLMError) -> SummarizeError {
    let message = err.to_string();
    if RATE_LIMIT_REGEX.is_match(&message) {
        SummarizeError::RateLimited(message)
    } else {
        SummarizeError::Failed(format!("LLM error: {message}."))
    }
}

/// Calls the summarizer, retrying the same batch while it is rate limited.
///
/// At most `max_retries` attempts are made (at least one), with `retry_delay`
/// between consecutive attempts.
///
/// # Errors
///
/// Returns the last rate limit error once the attempts are used up, or any
/// other summarizer error immediately
pub async fn summarize_with_retry<S: Summarizer>(
    summarizer: &S,
    texts: &[String],
    max_retries: u32,
    retry_delay: Duration,
) -> Result<Vec<String>, SummarizeError> {
    let attempts = max_retries.max(1);
    let mut attempt = 1;

    loop {
        match summarizer.summarize_batch(texts).await {
            Ok(summaries) => return Ok(summaries),
            Err(err) if err.is_rate_limited() && attempt < attempts => {
                warn!("{err} (attempt {attempt}/{attempts}), retrying in {retry_delay:?}");
                tokio::time::sleep(retry_delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Joins each restaurant's documents into one text.
///
/// Expects `(name, content)` pairs ordered by name; documents of the same
/// restaurant are space-joined in the order given.
pub fn group_documents(documents: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut grouped: Vec<(String, String)> = Vec::new();

    for (name, content) in documents {
        if let Some((last_name, text)) = grouped.last_mut()
            && *last_name == name
        {
            text.push(' ');
            text.push_str(&content);
            continue;
        }
        grouped.push((name, content));
    }

    grouped
}

/// Summarizes every restaurant that has content but no summary yet.
///
/// Texts are batched under `config.max_chars_per_batch`. Each batch's
/// summaries are committed before the next batch is sent, so a halted run
/// keeps its progress and the next run picks up where it stopped.
///
/// # Errors
///
/// Returns [`PipelineError::RetriesExhausted`] if a batch stays rate limited,
/// [`PipelineError::SummaryCountMismatch`] if the summarizer answers with the
/// wrong number of summaries, or an error if any other summarizer or database
/// operation fails
pub async fn summarize_new<S: Summarizer>(
    storage: &Storage,
    summarizer: &S,
    config: &SummarizeConfig,
) -> Result<StageReport> {
    let mut report = StageReport::new("summarize");
    let grouped = group_documents(storage.unsummarized_documents()?);
    report.processed = grouped.len();

    if grouped.is_empty() {
        info!("No restaurants to summarize. All restaurants already have summaries.");
        return Ok(report);
    }

    let texts: Vec<&str> = grouped.iter().map(|(_, text)| text.as_str()).collect();

    for (batch, indices) in partition(config.max_chars_per_batch, &texts).enumerate() {
        let entries: Vec<&(String, String)> =
            indices.iter().filter_map(|&index| grouped.get(index)).collect();
        let batch_texts: Vec<String> = entries.iter().map(|(_, text)| text.clone()).collect();
        debug!("Summarizing batch {batch} with {} restaurants", entries.len());

        let summaries = match summarize_with_retry(
            summarizer,
            &batch_texts,
            config.max_retries,
            config.retry_delay,
        )
        .await
        {
            Ok(summaries) => summaries,
            Err(SummarizeError::RateLimited(message)) => {
                error!("Giving up on batch {batch}: {message}");
                return Err(PipelineError::RetriesExhausted {
                    batch,
                    attempts: config.max_retries.max(1),
                    summarized: report.added,
                }
                .into());
            }
            Err(err) => return Err(err).with_context(|| format!("Batch {batch} failed")),
        };

        if summaries.len() != entries.len() {
            return Err(PipelineError::SummaryCountMismatch {
                expected: entries.len(),
                actual: summaries.len(),
            }
            .into());
        }

        let inserted = storage.in_transaction(|tx| {
            let mut inserted = 0;
            for ((name, _), summary) in entries.iter().zip(&summaries) {
                if tx.insert_summary(name, summary)? {
                    inserted += 1;
                }
            }
            Ok(inserted)
        })?;

        report.added += inserted;
        report.skipped += entries.len() - inserted;
        info!("Summarized batch {batch}: {inserted} restaurants");
    }

    info!("{report}");
    Ok(report)
}

/// Builds the LLM model described by `llm_builder`.
///
/// # Errors
///
/// Returns an error if the backend rejects the configuration
pub fn build_model(llm_builder: LLMBuilder) -> Result<Box<dyn LLMProvider>> {
    llm_builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build LLM model: {}", e))
}

/// Builds the LLM model and summarizes every restaurant without a summary.
///
/// # Errors
///
/// Returns an error if:
/// * The LLM model fails to build
/// * The summarization stage halts
pub async fn run_summarization(
    storage: &Storage,
    llm_builder: LLMBuilder,
    prompt_template: Option<&str>,
    rpm: Option<u32>,
    config: &SummarizeConfig,
) -> Result<StageReport> {
    let model = build_model(llm_builder)?;
    let rate_limiter = rpm.and_then(build_rate_limiter);

    let ctx = SummarizeContext {
        model: model.as_ref(),
        prompt_template,
        rate_limiter: rate_limiter.as_ref(),
    };

    summarize_new(storage, &ctx, config).await
}
