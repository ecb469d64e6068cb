//! Record parsers for the three page shapes of the listing source:
//! overview rows, restaurant detail pages and related articles.
//!
//! Parsing is eager. Each record keeps only owned strings, so no parsed DOM
//! outlives the call that produced it.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::extract::{
    Query, element_text, extract_first, extract_list, extract_text, join_non_absent,
};
use crate::storage::{ContentDocument, EntityRecord};

/// Feature label of the meal type attribute on a detail page.
pub const MEAL_TYPE_LABEL: &str = "Maaltijd";
/// Feature label of the district attribute on a detail page.
pub const DISTRICT_LABEL: &str = "Stadsdeel";
/// Feature label of the kind-of-venue attribute on a detail page.
pub const KIND_LABEL: &str = "Soort zaak";
/// Feature label of the price tier attribute on a detail page.
pub const PRICE_TIER_LABEL: &str = "Prijsniveau";

pub(crate) static LISTING_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.resultaat").expect("Invalid listing row selector"));
static TEMPORARILY_CLOSED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.label-tijdelijk").expect("Invalid closed label selector"));
static PERMANENTLY_CLOSED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.label-permanent").expect("Invalid closed label selector"));
static LISTING_NAME: Lazy<Query> =
    Lazy::new(|| Query::own_text("a.title").expect("Invalid listing name query"));
static LISTING_URL: Lazy<Query> = Lazy::new(|| {
    Query::attr("div[class*=item-info] a[class*=title]", "href")
        .expect("Invalid listing url query")
});
static LISTING_IMAGE: Lazy<Query> = Lazy::new(|| {
    Query::attr("div.item-image > a > img", "src").expect("Invalid listing image query")
});

static STREET: Lazy<Query> =
    Lazy::new(|| Query::own_text("div.address > span.street").expect("Invalid street query"));
static POSTCODE: Lazy<Query> = Lazy::new(|| {
    Query::own_text("div.address > span.postcode").expect("Invalid postcode query")
});
static TAGS: Lazy<Query> = Lazy::new(|| {
    Query::own_text("div.page-section-tags > a.btn-tag-large").expect("Invalid tags query")
});
static WEBSITE: Lazy<Query> = Lazy::new(|| {
    Query::attr("div.restaurant-contact div.website div.show > a", "href")
        .expect("Invalid website query")
});
static SOCIAL: Lazy<Query> = Lazy::new(|| {
    Query::attr("div.restaurant-contact li.instagram > a", "href").expect("Invalid social query")
});
static INTRO: Lazy<Query> =
    Lazy::new(|| Query::own_text("div.introductie > p").expect("Invalid intro query"));
static DESCRIPTION: Lazy<Query> =
    Lazy::new(|| Query::own_text("div.omschrijving > p").expect("Invalid description query"));
static RELATED_ARTICLES: Lazy<Query> = Lazy::new(|| {
    Query::attr("div.verhalen-item div.item-image a", "href").expect("Invalid articles query")
});
static FEATURE_LABELS: Lazy<Query> = Lazy::new(|| {
    Query::own_text("div[class*=content] > dl > dt").expect("Invalid feature label query")
});
static FEATURE_VALUES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div[class*=content] > dl > dd").expect("Invalid feature value selector")
});

static ARTICLE_BODY: Lazy<Query> =
    Lazy::new(|| Query::own_text("div.content p").expect("Invalid article body query"));
static ARTICLE_SUBHEADINGS: Lazy<Query> =
    Lazy::new(|| Query::own_text("div.content h2.p1").expect("Invalid subheading query"));
static ARTICLE_TITLE: Lazy<Query> =
    Lazy::new(|| Query::own_text("div.title h1").expect("Invalid article title query"));

/// Fields of one overview row. Malformed rows leave `name` or `detail_url` empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingFields {
    pub name: Option<String>,
    pub detail_url: Option<String>,
    pub image_url: Option<String>,
}

/// One row of the listing overview.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingRecord {
    fields: ListingFields,
    closed: bool,
}

impl ListingRecord {
    /// Parses every result row of a listing document, in source order.
    pub fn parse_all(html: &str) -> Vec<Self> {
        let document = Html::parse_document(html);
        document
            .root_element()
            .select(&LISTING_ROW)
            .map(Self::from_row)
            .collect()
    }

    fn from_row(row: ElementRef<'_>) -> Self {
        let closed = row.select(&TEMPORARILY_CLOSED).next().is_some()
            || row.select(&PERMANENTLY_CLOSED).next().is_some();

        Self {
            fields: ListingFields {
                name: extract_first(row, &LISTING_NAME),
                detail_url: extract_first(row, &LISTING_URL),
                image_url: extract_first(row, &LISTING_IMAGE),
            },
            closed,
        }
    }

    /// False when the row carries a temporarily or permanently closed marker.
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Copies out the row's fields.
    pub fn to_fields(&self) -> ListingFields {
        self.fields.clone()
    }
}

/// The restaurant's own detail page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetailRecord {
    name: String,
    street: Option<String>,
    postcode: Option<String>,
    tags: Option<String>,
    website_url: Option<String>,
    social_url: Option<String>,
    intro: Option<String>,
    description: Option<String>,
    articles: Vec<String>,
    feature_labels: Vec<String>,
    feature_values: Vec<String>,
}

impl DetailRecord {
    /// Parses a detail page of the restaurant called `name`.
    pub fn parse(name: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let feature_values = root
            .select(&FEATURE_VALUES)
            .map(|value| element_text(value, " ").unwrap_or_default())
            .collect();

        Self {
            name: name.to_string(),
            street: extract_text(root, &STREET, " "),
            postcode: extract_text(root, &POSTCODE, " "),
            tags: extract_text(root, &TAGS, ", "),
            website_url: extract_text(root, &WEBSITE, " "),
            social_url: extract_text(root, &SOCIAL, " "),
            intro: extract_text(root, &INTRO, " "),
            description: extract_text(root, &DESCRIPTION, " "),
            articles: extract_list(root, &RELATED_ARTICLES).unwrap_or_default(),
            feature_labels: extract_list(root, &FEATURE_LABELS).unwrap_or_default(),
            feature_values,
        }
    }

    /// Name the listing gave the restaurant.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Street and postal code, whichever are present.
    pub fn address(&self) -> Option<String> {
        join_non_absent([self.street.as_deref(), self.postcode.as_deref()])
    }

    /// Tags rendered as `"Labels: a, b."`, or `None` without tags.
    pub fn tags(&self) -> Option<String> {
        self.tags.as_ref().map(|tags| format!("Labels: {tags}."))
    }

    /// The restaurant's own website, if linked.
    pub fn website_url(&self) -> Option<&str> {
        self.website_url.as_deref()
    }

    /// The restaurant's Instagram page, if linked.
    pub fn social_url(&self) -> Option<&str> {
        self.social_url.as_deref()
    }

    /// Introduction and description text.
    pub fn info(&self) -> Option<String> {
        join_non_absent([self.intro.as_deref(), self.description.as_deref()])
    }

    /// Whether the page has an introduction or description.
    pub fn has_info(&self) -> bool {
        self.info().is_some()
    }

    /// The restaurant's own content document: its info followed by its tags.
    pub fn content(&self) -> Option<String> {
        join_non_absent([self.info(), self.tags()])
    }

    /// Links to related articles, in page order.
    pub fn articles(&self) -> &[String] {
        &self.articles
    }

    /// Whether the page links to related articles.
    pub fn has_articles(&self) -> bool {
        !self.articles.is_empty()
    }

    /// Categorical features keyed by their label.
    pub fn features(&self) -> HashMap<String, String> {
        pair_features(&self.feature_labels, &self.feature_values)
    }

    /// Builds the structured record stored for the restaurant.
    pub fn to_fields(&self) -> EntityRecord {
        let mut features = self.features();

        EntityRecord {
            name: self.name.clone(),
            website_url: self.website_url.clone(),
            social_url: self.social_url.clone(),
            address: self.address(),
            meal_type: features.remove(MEAL_TYPE_LABEL),
            district: features.remove(DISTRICT_LABEL),
            kind: features.remove(KIND_LABEL),
            price_tier: features.remove(PRICE_TIER_LABEL),
        }
    }
}

/// Pairs labels with values by position.
///
/// Label `i` gets value `i`. Pairing stops at the end of the shorter list, so
/// surplus labels or values are dropped. A repeated label keeps its last value.
pub fn pair_features(labels: &[String], values: &[String]) -> HashMap<String, String> {
    labels
        .iter()
        .zip(values)
        .map(|(label, value)| (label.clone(), value.clone()))
        .collect()
}

/// An article page related to a restaurant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArticleRecord {
    name: String,
    source_url: String,
    body: Option<String>,
    subheadings: Option<String>,
    title: Option<String>,
}

impl ArticleRecord {
    /// Parses an article about `name` fetched from `source_url`.
    pub fn parse(name: &str, source_url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let root = document.root_element();

        Self {
            name: name.to_string(),
            source_url: source_url.to_string(),
            body: extract_text(root, &ARTICLE_BODY, " "),
            subheadings: extract_text(root, &ARTICLE_SUBHEADINGS, ". "),
            title: extract_text(root, &ARTICLE_TITLE, " "),
        }
    }

    /// Body text, then sub-headings, then title.
    pub fn content(&self) -> Option<String> {
        join_non_absent([
            self.body.as_deref(),
            self.subheadings.as_deref(),
            self.title.as_deref(),
        ])
    }

    /// Builds the content document stored for the article.
    pub fn to_fields(&self) -> ContentDocument {
        ContentDocument {
            name: self.name.clone(),
            source_url: self.source_url.clone(),
            content: self.content(),
        }
    }
}
