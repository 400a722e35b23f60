//! Body text, attribution and overview of a listing entry.

use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::entry::ListingEntry;
use super::extract::{ExtractContext, ExtractError};
use super::model::OriginalAuthor;
use crate::constants::{DELETED_REPOST_CONTENT, FULL_TEXT_MARKER, LIKE_MARKER, REPOST_ORIGINAL_MARKER};
use crate::parse::{first_text_node, has_exact_class, parse_document, TextNormalizer};

static DIV_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("div").unwrap());
static SPAN_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("span").unwrap());

/// Textual fields of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent {
    pub original_user: OriginalAuthor,
    pub retweet_reason: String,
    pub content: String,
    pub overview: String,
}

/// `text` up to the rightmost `marker`, or all of it when there is none.
#[must_use]
pub fn before_rightmost<'a>(text: &'a str, marker: &str) -> &'a str {
    text.rfind(marker).map_or(text, |pos| &text[..pos])
}

/// `text` between its first `:` and the rightmost `marker`.
///
/// Empty when the marker precedes the colon.
fn after_colon_before_rightmost<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(':').map_or(0, |pos| pos + 1);
    let end = text.rfind(marker)?;
    Some(text.get(start..end).unwrap_or(""))
}

/// Body of a permalink page: the second entry block, from the first colon
/// up to the rightmost occurrence of the page's time line.
#[must_use]
pub fn long_text_from_document(document: &Html, normalizer: &TextNormalizer) -> Option<String> {
    let block = document
        .select(&DIV_SELECTOR)
        .filter(|div| has_exact_class(div, "c"))
        .nth(1)?;
    let text = normalizer.normalize(&block);

    let time = document
        .select(&SPAN_SELECTOR)
        .find(|span| has_exact_class(span, "ct"))
        .and_then(|span| first_text_node(&span))
        .map(|t| normalizer.normalize_str(&t));

    let start = text.find(':').map_or(0, |pos| pos + 1);
    let end = time
        .filter(|t| !t.is_empty())
        .and_then(|t| text.rfind(t.as_str()))
        .unwrap_or(text.len());
    let body = text.get(start..end).unwrap_or("").trim();
    (!body.is_empty()).then(|| body.to_string())
}

async fn fetch_long_text(ctx: &ExtractContext<'_>, url: &str) -> anyhow::Result<Option<String>> {
    let response = ctx.fetcher.fetch(url).await?.error_for_status()?;
    let document = parse_document(&response.body)?;
    Ok(long_text_from_document(&document, &ctx.normalizer))
}

/// Content of an original post, expanded through its permalink when the
/// listing truncated it.
pub(crate) async fn original_content(ctx: &ExtractContext<'_>, entry: &ListingEntry) -> PostContent {
    let mut content = before_rightmost(&entry.text, LIKE_MARKER).trim().to_string();

    if entry.has_anchor_text(FULL_TEXT_MARKER) {
        let url = ctx.endpoints.permalink(&entry.id, true);
        match fetch_long_text(ctx, &url).await {
            Ok(Some(full)) => content = full,
            Ok(None) => debug!(post_id = %entry.id, "Permalink had no body, keeping listing text"),
            Err(e) => warn!(post_id = %entry.id, url = %url, error = %e, "Failed to expand long post"),
        }
    }

    PostContent {
        original_user: OriginalAuthor::Own,
        retweet_reason: String::new(),
        overview: content.clone(),
        content,
    }
}

/// Content, attribution and reason of a repost.
///
/// # Errors
///
/// Returns an error when the trailing block carries no like marker, which
/// bounds the reposter's reason.
pub(crate) async fn repost_content(
    ctx: &ExtractContext<'_>,
    entry: &ListingEntry,
) -> Result<PostContent, ExtractError> {
    let (original_user, content) = match &entry.attribution_user {
        None => (OriginalAuthor::Deleted, DELETED_REPOST_CONTENT.to_string()),
        Some(author) => {
            let wrapped = after_colon_before_rightmost(&entry.text, LIKE_MARKER).unwrap_or("");
            let mut content = before_rightmost(wrapped, LIKE_MARKER).trim().to_string();

            if entry.has_anchor_text(FULL_TEXT_MARKER) {
                let url = ctx.endpoints.permalink(&entry.id, false);
                match fetch_long_text(ctx, &url).await {
                    // Repost permalinks end the cited text at the repost counter
                    // rather than at the time line.
                    Ok(Some(full)) => {
                        content = before_rightmost(&full, REPOST_ORIGINAL_MARKER).trim().to_string();
                    }
                    Ok(None) => debug!(post_id = %entry.id, "Permalink had no body, keeping listing text"),
                    Err(e) => warn!(post_id = %entry.id, url = %url, error = %e, "Failed to expand long repost"),
                }
            }

            (OriginalAuthor::User(author.clone()), content)
        }
    };

    let retweet_reason = after_colon_before_rightmost(&entry.last_block_text, LIKE_MARKER)
        .ok_or_else(|| ExtractError::MissingLikeMarker {
            id: entry.id.clone(),
        })?
        .trim()
        .to_string();

    let overview = format!(
        "{retweet_reason}\noriginal user: {}\nretweeted content: {content}",
        original_user.as_sentinel()
    );

    Ok(PostContent {
        original_user,
        retweet_reason,
        content,
        overview,
    })
}
