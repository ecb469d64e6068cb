//! The discover module reads the listing overview and finds restaurants that
//! are open and not known yet.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;

use crate::fetch::PageFetcher;
use crate::parse::{ListingFields, ListingRecord};
use crate::report::StageReport;
use crate::storage::{ListingRef, Storage};

/// New listings found on the overview, in source order.
#[derive(Debug)]
pub struct Discovery {
    pub listings: Vec<ListingRef>,
    pub report: StageReport,
}

/// Fetches the listing overview and returns the rows worth following up.
///
/// Closed rows, rows without a name or detail link and rows whose name is in
/// `existing_names` are dropped. Nothing is written; the caller decides how to
/// commit the result.
///
/// # Errors
///
/// Returns an error if the listing overview cannot be fetched
pub async fn discover<F: PageFetcher>(
    fetcher: &F,
    existing_names: &HashSet<String>,
) -> Result<Discovery> {
    let html = fetcher
        .fetch_listing_page()
        .await
        .context("Unable to fetch the listing overview")?;

    Ok(select_new_listings(&html, existing_names))
}

/// Parses a listing document and keeps the open, well-formed, unknown rows.
pub fn select_new_listings(html: &str, existing_names: &HashSet<String>) -> Discovery {
    let mut report = StageReport::new("discover");
    let mut seen = HashSet::new();
    let mut listings = Vec::new();

    for record in ListingRecord::parse_all(html) {
        report.processed += 1;

        if !record.is_open() {
            debug!("Skipping closed listing {:?}", record.to_fields().name);
            report.skipped += 1;
            continue;
        }

        let ListingFields {
            name: Some(name),
            detail_url: Some(detail_url),
            image_url,
        } = record.to_fields()
        else {
            warn!("Skipping malformed listing row {:?}", record.to_fields());
            report.skipped += 1;
            continue;
        };

        if existing_names.contains(&name) || !seen.insert(name.clone()) {
            report.skipped += 1;
            continue;
        }

        listings.push(ListingRef {
            name,
            detail_url,
            image_url,
        });
    }

    report.added = listings.len();
    Discovery { listings, report }
}

/// Discovers new listings and stores them in one transaction.
///
/// # Errors
///
/// Returns an error if the overview cannot be fetched or the listings cannot be stored
pub async fn run_discovery<F: PageFetcher>(storage: &Storage, fetcher: &F) -> Result<StageReport> {
    let existing_names = storage.listing_names()?;
    let Discovery {
        listings,
        mut report,
    } = discover(fetcher, &existing_names).await?;

    report.added = storage.in_transaction(|tx| {
        let mut inserted = 0;
        for listing in &listings {
            if tx.insert_listing(listing)? {
                inserted += 1;
            }
        }
        Ok(inserted)
    })?;

    info!("{report}");
    Ok(report)
}
