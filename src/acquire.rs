//! The acquire module fetches the detail page and related articles of each
//! listing and stores them, one listing per transaction.

use anyhow::{Context, Result};
use log::{debug, error, info};

use crate::fetch::PageFetcher;
use crate::parse::{ArticleRecord, DetailRecord};
use crate::report::StageReport;
use crate::storage::{ContentDocument, EntityRecord, ListingRef, Storage, UnitOfWork};

/// Everything gathered for one listing before it is written.
#[derive(Debug)]
struct Acquired {
    entity: EntityRecord,
    documents: Vec<ContentDocument>,
}

/// Acquires the details of `listings` in order.
///
/// Listings that already have a restaurant record are skipped. A fetch failure
/// abandons only the listing it happened on. Each listing's record and
/// documents are committed together before the next listing starts.
///
/// # Errors
///
/// Returns an error if database operation fails
pub async fn acquire_details<F: PageFetcher>(
    storage: &Storage,
    fetcher: &F,
    listings: &[ListingRef],
) -> Result<StageReport> {
    let mut report = StageReport::new("acquire");

    for listing in listings {
        report.processed += 1;

        if storage.entity_exists(&listing.name)? {
            debug!("{} is already acquired", listing.name);
            report.skipped += 1;
            continue;
        }

        info!("Acquiring {}", listing.name);
        let acquired = match fetch_listing(fetcher, listing).await {
            Ok(acquired) => acquired,
            Err(err) => {
                error!("Skipping {}: {err:#}", listing.name);
                report.failed += 1;
                continue;
            }
        };

        if storage.in_transaction(|tx| store(tx, &acquired))? {
            debug!(
                "Stored {} with {} documents",
                listing.name,
                acquired.documents.len()
            );
            report.added += 1;
        } else {
            report.skipped += 1;
        }
    }

    info!("{report}");
    Ok(report)
}

/// Acquires every stored listing that has no restaurant record yet.
///
/// # Errors
///
/// Returns an error if database operation fails
pub async fn acquire_pending<F: PageFetcher>(storage: &Storage, fetcher: &F) -> Result<StageReport> {
    let listings = storage.pending_listings()?;
    info!("{} listings waiting for details", listings.len());
    acquire_details(storage, fetcher, &listings).await
}

async fn fetch_listing<F: PageFetcher>(fetcher: &F, listing: &ListingRef) -> Result<Acquired> {
    let html = fetcher
        .fetch_detail_page(&listing.detail_url)
        .await
        .with_context(|| format!("Unable to fetch detail page {}", listing.detail_url))?;
    let detail = DetailRecord::parse(&listing.name, &html);

    let mut documents = Vec::new();
    if detail.has_info() {
        documents.push(ContentDocument {
            name: listing.name.clone(),
            source_url: listing.detail_url.clone(),
            content: detail.content(),
        });
    }

    for article_url in detail.articles() {
        let html = fetcher
            .fetch_detail_page(article_url)
            .await
            .with_context(|| format!("Unable to fetch article {article_url}"))?;
        documents.push(ArticleRecord::parse(&listing.name, article_url, &html).to_fields());
    }

    Ok(Acquired {
        entity: detail.to_fields(),
        documents,
    })
}

fn store(tx: &UnitOfWork<'_>, acquired: &Acquired) -> Result<bool> {
    if !tx.insert_entity(&acquired.entity)? {
        return Ok(false);
    }

    for document in &acquired.documents {
        tx.insert_document(document)?;
    }

    Ok(true)
}
