//! Declarative field extraction from parsed HTML.
//!
//! A [`Query`] pairs a CSS selector with what to read from every element it
//! matches. Extraction never fails: a query without matches yields `None`, so
//! callers can tell "field not present" apart from "field present but empty".

use anyhow::Result;
use scraper::{ElementRef, Selector};

/// What a query reads from each matched element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Text nodes that are direct children of the element.
    OwnText,
    /// Every descendant text node of the element.
    Text,
    /// The value of the named attribute.
    Attr(&'static str),
}

/// A compiled extraction rule.
#[derive(Debug)]
pub struct Query {
    selector: Selector,
    target: Target,
}

impl Query {
    /// Compiles a query from a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns an error if `css` is not a valid selector.
    pub fn new(css: &str, target: Target) -> Result<Self> {
        let selector = Selector::parse(css)
            .map_err(|e| anyhow::anyhow!("Invalid CSS selector {css}: {e}"))?;

        Ok(Self { selector, target })
    }

    /// Reads the matched elements' own text nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if `css` is not a valid selector.
    pub fn own_text(css: &str) -> Result<Self> {
        Self::new(css, Target::OwnText)
    }

    /// Reads all text below the matched elements.
    ///
    /// # Errors
    ///
    /// Returns an error if `css` is not a valid selector.
    pub fn text(css: &str) -> Result<Self> {
        Self::new(css, Target::Text)
    }

    /// Reads an attribute of the matched elements.
    ///
    /// # Errors
    ///
    /// Returns an error if `css` is not a valid selector.
    pub fn attr(css: &str, name: &'static str) -> Result<Self> {
        Self::new(css, Target::Attr(name))
    }

    /// Every non-blank match below `scope`, trimmed, in document order.
    pub fn matches(&self, scope: ElementRef<'_>) -> Vec<String> {
        let mut found = Vec::new();

        for element in scope.select(&self.selector) {
            match self.target {
                Target::OwnText => {
                    for node in element.children() {
                        if let Some(text) = node.value().as_text() {
                            push_trimmed(&mut found, text);
                        }
                    }
                }
                Target::Text => {
                    for text in element.text() {
                        push_trimmed(&mut found, text);
                    }
                }
                Target::Attr(name) => {
                    if let Some(value) = element.value().attr(name) {
                        push_trimmed(&mut found, value);
                    }
                }
            }
        }

        found
    }
}

fn push_trimmed(found: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        found.push(text.to_string());
    }
}

/// How multiple matches are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator<'a> {
    /// Join matches into one string.
    Join(&'a str),
    /// Keep the ordered matches as they are. Used for URL lists.
    Disabled,
}

impl Default for Separator<'_> {
    fn default() -> Self {
        Separator::Join(" ")
    }
}

/// Result of a successful extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extracted {
    Text(String),
    List(Vec<String>),
}

impl Extracted {
    /// The extracted text, with list items space-joined.
    pub fn into_text(self) -> String {
        match self {
            Extracted::Text(text) => text,
            Extracted::List(items) => items.join(" "),
        }
    }

    /// The extracted items, with joined text as a single item.
    pub fn into_list(self) -> Vec<String> {
        match self {
            Extracted::Text(text) => vec![text],
            Extracted::List(items) => items,
        }
    }
}

/// Applies `query` below `scope`. Returns `None` when nothing matched.
pub fn extract(scope: ElementRef<'_>, query: &Query, separator: Separator<'_>) -> Option<Extracted> {
    let found = query.matches(scope);
    if found.is_empty() {
        return None;
    }

    Some(match separator {
        Separator::Join(sep) => Extracted::Text(found.join(sep)),
        Separator::Disabled => Extracted::List(found),
    })
}

/// Extracts all matches joined with `sep`.
pub fn extract_text(scope: ElementRef<'_>, query: &Query, sep: &str) -> Option<String> {
    extract(scope, query, Separator::Join(sep)).map(Extracted::into_text)
}

/// Extracts all matches as an ordered list.
pub fn extract_list(scope: ElementRef<'_>, query: &Query) -> Option<Vec<String>> {
    extract(scope, query, Separator::Disabled).map(Extracted::into_list)
}

/// Extracts only the first match.
pub fn extract_first(scope: ElementRef<'_>, query: &Query) -> Option<String> {
    query.matches(scope).into_iter().next()
}

/// All descendant text of a single element joined with `sep`.
pub fn element_text(element: ElementRef<'_>, sep: &str) -> Option<String> {
    let mut found = Vec::new();
    for text in element.text() {
        push_trimmed(&mut found, text);
    }

    (!found.is_empty()).then(|| found.join(sep))
}

/// Space-joins the present values. `None` only if every value is absent.
///
/// Combines multi-part fields such as street and postal code without leaving
/// a dangling separator when one part is missing.
pub fn join_non_absent<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let parts: Vec<String> = values
        .into_iter()
        .flatten()
        .map(|value| value.as_ref().to_string())
        .collect();

    (!parts.is_empty()).then(|| parts.join(" "))
}
