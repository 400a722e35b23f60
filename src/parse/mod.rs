//! Turning fetched bytes into a navigable tree, plus the structural helpers
//! the extraction heuristics are written against.

mod text;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

pub use text::TextNormalizer;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is empty")]
    Empty,
    #[error("expected HTML but the document looks like JSON")]
    NotHtml,
}

static TITLE_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("title").unwrap());

/// Parse a fetched HTML payload.
///
/// Invalid UTF-8 is replaced rather than rejected; the parser itself is
/// error-tolerant, so only payloads that cannot be a page at all fail.
///
/// # Errors
///
/// Returns an error if the payload is blank or is a JSON document.
pub fn parse_document(bytes: &[u8]) -> Result<Html, ParseError> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Err(ParseError::NotHtml);
    }
    Ok(Html::parse_document(&text))
}

/// Text of the document's `<title>`, if any.
#[must_use]
pub fn page_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
}

/// Direct element children of `element` with the given tag name.
pub fn child_elements<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

/// Whether the element's `class` attribute is exactly `class`.
///
/// The mobile markup uses single-class attributes, and the heuristics count
/// on exact matches (`span.cmt` inside `span.cmt ct` must not count).
#[must_use]
pub fn has_exact_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().attr("class") == Some(class)
}

/// Concatenated direct text children of `element`, without descending.
#[must_use]
pub fn own_text(element: &ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect()
}

/// First direct text child of `element`.
#[must_use]
pub fn first_text_node(element: &ElementRef<'_>) -> Option<String> {
    element
        .children()
        .find_map(|node| node.value().as_text().map(|t| t.to_string()))
}
