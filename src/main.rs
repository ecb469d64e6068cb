//! tablescout is a CLI tool that collects restaurants from a listing site into a
//! local database and summarizes what is written about them with an LLM.
//!
//! The tool has three pipeline commands, each safe to run repeatedly:
//! 1. `discover` - Stores open restaurants from the listing overview that are not known yet
//! 2. `acquire` - Stores details and related articles of every discovered restaurant
//! 3. `summarize` - Summarizes the stored content of every restaurant without a summary
//!
//! `run` executes all three in order, `reset` empties the database.

use std::fs;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use llm::builder::{LLMBackend, LLMBuilder};
use log::{LevelFilter, info};
use url::Url;

use tablescout::{
    HttpFetcher, SourceConfig, StageReport, Storage, SummarizeConfig,
    acquire::acquire_pending,
    constants::MODEL_API_KEY_ENV_NAME,
    discover::run_discovery,
    pipeline::run_pipeline,
    summarize::{SummarizeContext, build_model, build_rate_limiter, run_summarization},
};

/// A CLI tool to collect and summarize restaurants from a listing site
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute
    #[command(subcommand)]
    command: Command,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,

    /// Print stage reports as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Args)]
struct SourceArgs {
    /// Base address of the listing site, relative links are resolved against it
    #[arg(long)]
    base_url: String,
    /// Listing overview address, absolute or relative to the base address
    #[arg(long)]
    listing_url: Option<String>,
    /// Delay before every request in milliseconds (rate limiting)
    #[arg(long, short, default_value_t = 1000)]
    delay: u64,
    /// Maximum number of "load more" pages to follow on the overview
    #[arg(long, default_value_t = 100)]
    max_pages: usize,
}

#[derive(Args)]
struct SummarizeArgs {
    /// URL of the LLM model to use for processing
    model: String,
    /// Path to the file with a prompt template
    #[arg(long, short = 'p')]
    prompt_file: Option<String>,
    /// Character budget of one summarization batch
    #[arg(long, default_value_t = 12_000)]
    max_chars: usize,
    /// Attempts per batch while the model is rate limited
    #[arg(long, default_value_t = 6)]
    max_retries: u32,
    /// Seconds to wait between two attempts of a rate limited batch
    #[arg(long, default_value_t = 10)]
    retry_delay: u64,
    /// Rate limit: requests per minute (default: no limit)
    #[arg(long, short = 'r')]
    rpm: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Store open restaurants from the listing overview that are not known yet
    Discover {
        /// Path to database file to store restaurants data
        db: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Store details and related articles of discovered restaurants
    Acquire {
        /// Path to database file to store restaurants data
        db: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Summarize restaurants that have content but no summary yet
    Summarize {
        /// Path to database file to read restaurants from
        db: String,
        #[command(flatten)]
        summarize: SummarizeArgs,
    },
    /// Run discover, acquire and summarize in order
    Run {
        /// Path to database file to store restaurants data
        db: String,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        summarize: SummarizeArgs,
    },
    /// Remove all stored data
    Reset {
        /// Path to database file to clear
        db: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    let mut reports = Vec::new();
    let outcome = execute(cli.command, &mut reports).await;

    if cli.json {
        for report in &reports {
            println!("{}", report.to_json());
        }
        if let Err(err) = &outcome {
            println!("{}", serde_json::json!({ "error": format!("{err:#}") }));
        }
    }

    outcome
}

/// Runs `command`, pushing the report of every finished stage onto `reports`.
async fn execute(command: Command, reports: &mut Vec<StageReport>) -> Result<()> {
    match command {
        Command::Discover { db, source } => {
            let storage = Storage::new(&db)?;
            let fetcher = HttpFetcher::new(source_config(&source)?)?;
            reports.push(run_discovery(&storage, &fetcher).await?);
        }
        Command::Acquire { db, source } => {
            let storage = Storage::new(&db)?;
            let fetcher = HttpFetcher::new(source_config(&source)?)?;
            reports.push(acquire_pending(&storage, &fetcher).await?);
        }
        Command::Summarize { db, summarize } => {
            let storage = Storage::new(&db)?;
            let setup = summarize_setup(summarize)?;
            reports.push(
                run_summarization(
                    &storage,
                    setup.llm_builder,
                    setup.prompt_template.as_deref(),
                    setup.rpm,
                    &setup.config,
                )
                .await?,
            );
        }
        Command::Run {
            db,
            source,
            summarize,
        } => {
            let storage = Storage::new(&db)?;
            let fetcher = HttpFetcher::new(source_config(&source)?)?;
            let setup = summarize_setup(summarize)?;
            let model = build_model(setup.llm_builder)?;
            let rate_limiter = setup.rpm.and_then(build_rate_limiter);
            let ctx = SummarizeContext {
                model: model.as_ref(),
                prompt_template: setup.prompt_template.as_deref(),
                rate_limiter: rate_limiter.as_ref(),
            };
            run_pipeline(&storage, &fetcher, &ctx, &setup.config, reports).await?;
        }
        Command::Reset { db } => {
            Storage::new(&db)?.reset()?;
            info!("Cleared database {db}");
        }
    }

    Ok(())
}

fn source_config(args: &SourceArgs) -> Result<SourceConfig> {
    let base_url =
        Url::parse(&args.base_url).map_err(|e| anyhow::anyhow!("Invalid base url: {}", e))?;
    let listing_url = match &args.listing_url {
        Some(listing_url) => base_url
            .join(listing_url)
            .map_err(|e| anyhow::anyhow!("Invalid listing url: {}", e))?,
        None => base_url.clone(),
    };

    Ok(SourceConfig {
        listing_url,
        base_url,
        request_delay: Duration::from_millis(args.delay),
        max_listing_pages: args.max_pages,
    })
}

/// Everything the summarization stage needs, read from the command line.
struct SummarizeSetup {
    llm_builder: LLMBuilder,
    prompt_template: Option<String>,
    rpm: Option<u32>,
    config: SummarizeConfig,
}

fn summarize_setup(args: SummarizeArgs) -> Result<SummarizeSetup> {
    let model_url =
        Url::parse(&args.model).map_err(|e| anyhow::anyhow!("Invalid model URL: {}", e))?;
    let llm_builder = LLMBuilder::new()
        .backend(
            LLMBackend::from_str(model_url.scheme())
                .map_err(|e| anyhow::anyhow!("Invalid LLM backend: {}", e))?,
        )
        .model(
            [
                model_url
                    .host_str()
                    .context("Specify model name as host URL.")?,
                model_url.username(),
            ]
            .iter()
            .filter(|x| !x.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(":"),
        );

    let llm_builder = match std::env::var(MODEL_API_KEY_ENV_NAME) {
        Ok(model_key) => {
            info!("API key is provided via {MODEL_API_KEY_ENV_NAME}");
            llm_builder.api_key(model_key)
        }
        Err(err) => {
            info!("{err} while providing api key");
            llm_builder
        }
    };

    let prompt_template = match args.prompt_file {
        Some(file) => {
            let content =
                fs::read_to_string(&file).context(format!("Failed to read prompt file: {file}"))?;
            Some(content)
        }
        None => None,
    };

    Ok(SummarizeSetup {
        llm_builder,
        prompt_template,
        rpm: args.rpm,
        config: SummarizeConfig {
            max_chars_per_batch: args.max_chars,
            max_retries: args.max_retries,
            retry_delay: Duration::from_secs(args.retry_delay),
        },
    })
}
