//! One listing page, parsed into owned data.

use scraper::{ElementRef, Selector};
use tracing::warn;

use super::entry::ListingEntry;
use super::profile::{parse_page_count, parse_profile_counts, ProfileCounts};
use crate::constants::NEXT_PAGE_MARKER;
use crate::parse::{child_elements, has_exact_class, own_text, page_title, parse_document, ParseError, TextNormalizer};

/// Trailing `div.c` blocks on every listing that are not posts (pager and
/// page footer).
const TRAILING_NON_POST_BLOCKS: usize = 2;

static DIV_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("div").unwrap());
static ANCHOR_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("a").unwrap());

#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub title: Option<String>,
    /// Entries in the order the page renders them, newest first.
    pub entries: Vec<ListingEntry>,
    /// Entries that could not be read.
    pub skipped: usize,
    pub has_more: bool,
    pub page_count: u32,
    pub counts: Option<ProfileCounts>,
}

/// Parse a fetched listing page.
///
/// # Errors
///
/// Returns an error only if the payload is not a document at all.
pub fn parse_listing(body: &[u8], normalizer: &TextNormalizer) -> Result<ListingPage, ParseError> {
    let document = parse_document(body)?;

    let blocks: Vec<ElementRef<'_>> = document
        .select(&DIV_SELECTOR)
        .filter(|div| has_exact_class(div, "c"))
        .collect();

    // An empty timeline renders a notice block instead of a post.
    let has_posts = blocks.first().is_some_and(|first| {
        child_elements(*first, "div")
            .flat_map(|block| child_elements(block, "span"))
            .any(|span| has_exact_class(&span, "ctt"))
    });

    let mut entries = Vec::new();
    let mut skipped = 0;
    if has_posts {
        let post_blocks = &blocks[..blocks.len().saturating_sub(TRAILING_NON_POST_BLOCKS)];
        for block in post_blocks {
            match ListingEntry::from_element(*block, normalizer) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable listing entry");
                    skipped += 1;
                }
            }
        }
    }

    let has_more = document
        .select(&ANCHOR_SELECTOR)
        .any(|a| own_text(&a).trim() == NEXT_PAGE_MARKER);

    Ok(ListingPage {
        title: page_title(&document),
        entries,
        skipped,
        has_more,
        page_count: parse_page_count(&document),
        counts: parse_profile_counts(&document),
    })
}
