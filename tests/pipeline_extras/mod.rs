#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use tablescout::error::{FetchError, SummarizeError};
use tablescout::fetch::PageFetcher;
use tablescout::storage::{ContentDocument, EntityRecord, Storage};
use tablescout::summarize::Summarizer;

pub const ROZEY_URL: &str = "/rotterdam/restaurant/rozey";
pub const SHIKI_URL: &str = "/rotterdam/restaurant/shiki-sushi--lounge";
pub const ROZEY_ARTICLE_URL: &str = "/rotterdam/uit-eten/vegetarisch-de-wereld-rond-bij-rozey";

pub const LISTING_HTML: &str = r#"<html><body>
<div class="resultaat">
  <div class="item-image"><a href="/rotterdam/restaurant/rozey"><img src="https://img.example/rozey.jpg"></a></div>
  <div class="item-info"><a class="title" href="/rotterdam/restaurant/rozey">Rozey</a></div>
</div>
<div class="resultaat">
  <div class="label-tijdelijk">Tijdelijk gesloten</div>
  <div class="item-info"><a class="title" href="/rotterdam/restaurant/pauze">Pauze</a></div>
</div>
<div class="resultaat">
  <div class="item-info"><span>Coming soon</span></div>
</div>
<div class="resultaat">
  <div class="label-permanent">Permanent gesloten</div>
  <div class="item-info"><a class="title" href="/rotterdam/restaurant/oud">Oud</a></div>
</div>
<div class="resultaat">
  <div class="item-image"><a href="/rotterdam/restaurant/shiki-sushi--lounge"><img src="https://img.example/shiki.jpg"></a></div>
  <div class="item-info"><a class="title" href="/rotterdam/restaurant/shiki-sushi--lounge">Shiki Sushi &amp; Lounge</a></div>
</div>
</body></html>"#;

pub const ROZEY_HTML: &str = r#"<html><body>
<div class="address"><span class="street">Wijnhaven 85</span> <span class="postcode">3011 WK</span></div>
<div class="page-section-tags">
  <a class="btn-tag-large">Vegetarisch</a>
  <a class="btn-tag-large">Wereldkeuken</a>
</div>
<div class="restaurant-contact">
  <div class="website"><div class="show"><a href="https://rozey.example">rozey.example</a></div></div>
  <ul><li class="instagram"><a href="https://instagram.com/rozey">Instagram</a></li></ul>
</div>
<div class="introductie"><p>Rozey serves vegetarian dishes from around the world.</p></div>
<div class="omschrijving"><p>A cosy spot on the Wijnhaven.</p></div>
<div class="block-content">
  <dl>
    <dt>Maaltijd</dt><dd>Lunch, Diner</dd>
    <dt>Stadsdeel</dt><dd>Centrum</dd>
    <dt>Soort zaak</dt><dd>Restaurant</dd>
    <dt>Prijsniveau</dt><dd>Betaalbaar</dd>
  </dl>
</div>
<div class="verhalen-item">
  <div class="item-image"><a href="/rotterdam/uit-eten/vegetarisch-de-wereld-rond-bij-rozey"><img src="https://img.example/story.jpg"></a></div>
</div>
</body></html>"#;

pub const ROZEY_ARTICLE_HTML: &str = r#"<html><body>
<div class="title"><h1>Vegetarian around the world at Rozey</h1></div>
<div class="content">
  <p>Rozey cooks with seasonal vegetables.</p>
  <h2 class="p1">The menu</h2>
  <p>Every dish is made for sharing.</p>
  <h2 class="p1">The vibe</h2>
</div>
</body></html>"#;

pub const ROZEY_CONTENT: &str = "Rozey serves vegetarian dishes from around the world. A cosy spot on the Wijnhaven. Labels: Vegetarisch, Wereldkeuken.";
pub const ROZEY_ARTICLE_CONTENT: &str = "Rozey cooks with seasonal vegetables. Every dish is made for sharing. The menu. The vibe Vegetarian around the world at Rozey";

pub const SHIKI_HTML: &str = r#"<html><body>
<div class="address"><span class="street">Prins Alexanderlaan 37A</span></div>
<div class="block-content">
  <dl>
    <dt>Maaltijd</dt><dd>Diner</dd>
    <dt>Stadsdeel</dt><dd>Oost</dd>
    <dt>Prijsniveau</dt>
  </dl>
</div>
</body></html>"#;

/// Serves canned pages and remembers what was requested.
pub struct StubFetcher {
    listing: String,
    pages: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl StubFetcher {
    pub fn new(listing: &str) -> Self {
        Self {
            listing: listing.to_owned(),
            pages: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// The listing fixture with every page it links to.
    pub fn full_site() -> Self {
        Self::new(LISTING_HTML)
            .with_page(ROZEY_URL, ROZEY_HTML)
            .with_page(ROZEY_ARTICLE_URL, ROZEY_ARTICLE_HTML)
            .with_page(SHIKI_URL, SHIKI_HTML)
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_owned(), html.to_owned());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl PageFetcher for StubFetcher {
    async fn fetch_listing_page(&self) -> Result<String, FetchError> {
        Ok(self.listing.clone())
    }

    async fn fetch_detail_page(&self, url: &str) -> Result<String, FetchError> {
        self.requests.borrow_mut().push(url.to_owned());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_owned(),
                status: 404,
            })
    }
}

/// What the scripted summarizer does on one call.
#[derive(Clone, Copy, Debug)]
pub enum Reply {
    Summaries,
    RateLimited,
    Failed,
    Short,
}

/// Replays a script of replies, then answers every call successfully.
pub struct ScriptedSummarizer {
    script: RefCell<VecDeque<Reply>>,
    calls: Cell<usize>,
    batches: RefCell<Vec<Vec<String>>>,
}

impl ScriptedSummarizer {
    pub fn new(script: &[Reply]) -> Self {
        Self {
            script: RefCell::new(script.iter().copied().collect()),
            calls: Cell::new(0),
            batches: RefCell::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.borrow().clone()
    }
}

impl Summarizer for ScriptedSummarizer {
    async fn summarize_batch(&self, texts: &[String]) -> Result<Vec<String>, SummarizeError> {
        self.calls.set(self.calls.get() + 1);
        let reply = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or(Reply::Summaries);

        match reply {
            Reply::Summaries => {
                self.batches.borrow_mut().push(texts.to_vec());
                Ok(texts
                    .iter()
                    .map(|text| format!("Summary of: {text}"))
                    .collect())
            }
            Reply::RateLimited => Err(SummarizeError::RateLimited("429".to_owned())),
            Reply::Failed => Err(SummarizeError::Failed("model unavailable".to_owned())),
            Reply::Short => Ok(Vec::new()),
        }
    }
}

/// Stores a restaurant with the given documents.
pub fn seed(storage: &Storage, name: &str, contents: &[&str]) {
    storage
        .in_transaction(|tx| {
            tx.insert_entity(&EntityRecord {
                name: name.to_owned(),
                ..Default::default()
            })?;
            for (index, content) in contents.iter().enumerate() {
                tx.insert_document(&ContentDocument {
                    name: name.to_owned(),
                    source_url: format!("/{name}/{index}"),
                    content: Some((*content).to_owned()),
                })?;
            }
            Ok(())
        })
        .expect("Expected seeding to succeed.");
}
