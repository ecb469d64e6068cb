//! Page fetching. Stages only see the [`PageFetcher`] capability, so the HTTP
//! client below can be swapped for a browser session or a test double.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::config::SourceConfig;
use crate::constants::USER_AGENT;
use crate::error::FetchError;
use crate::parse::LISTING_ROW;

static LOAD_MORE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.meerladen[href]").expect("Invalid load more selector"));

/// Source of raw HTML documents.
///
/// One fetcher is one session; stages call it sequentially and never share it
/// between concurrent tasks.
pub trait PageFetcher {
    /// The complete listing overview as one document.
    fn fetch_listing_page(&self) -> impl Future<Output = Result<String, FetchError>>;

    /// A detail or article page. `url` may be relative to the source's base address.
    fn fetch_detail_page(&self, url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

/// Fetches pages over plain HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    config: SourceConfig,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        self.config
            .base_url
            .join(url)
            .map_err(|e| FetchError::InvalidUrl {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }

        debug!("Fetching {url}");
        let resp = self.client.get(url.as_str()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(resp.text().await?)
    }
}

impl PageFetcher for HttpFetcher {
    /// Follows the "load more" link page after page and stitches every result
    /// row into one document. A failing follow-up page ends the walk early.
    async fn fetch_listing_page(&self) -> Result<String, FetchError> {
        let mut next = Some(self.config.listing_url.clone());
        let mut visited = HashSet::new();
        let mut rows = Vec::new();

        while let Some(url) = next.take() {
            if visited.len() >= self.config.max_listing_pages || !visited.insert(url.to_string()) {
                break;
            }

            let html = match self.get(&url).await {
                Ok(html) => html,
                Err(err) if !rows.is_empty() => {
                    warn!("Stopping listing walk at {url}: {err}");
                    break;
                }
                Err(err) => return Err(err),
            };

            let (page_rows, load_more) = split_listing_page(&html);
            debug!("{url} holds {} rows", page_rows.len());
            rows.extend(page_rows);

            next = load_more.and_then(|href| url.join(&href).ok());
        }

        info!(
            "Read {} listing rows from {} pages",
            rows.len(),
            visited.len()
        );
        Ok(format!("<html><body>\n{}\n</body></html>", rows.join("\n")))
    }

    async fn fetch_detail_page(&self, url: &str) -> Result<String, FetchError> {
        let url = self.resolve(url)?;
        self.get(&url).await
    }
}

/// Outer HTML of every result row and the target of the "load more" link.
pub fn split_listing_page(html: &str) -> (Vec<String>, Option<String>) {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let rows = root.select(&LISTING_ROW).map(|row| row.html()).collect();
    let load_more = root
        .select(&LOAD_MORE)
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(str::to_string);

    (rows, load_more)
}
