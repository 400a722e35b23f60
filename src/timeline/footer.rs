//! Like, repost and comment counters from a post's trailing block.

use regex::Regex;
use thiserror::Error;

use crate::constants::LIKE_MARKER;

static NUMBER: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Like, repost and comment counters rendered at the end of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FooterCounts {
    pub up: u64,
    pub retweet: u64,
    pub comment: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FooterError {
    #[error("footer has no like marker")]
    MissingLikeMarker,
    #[error("footer has {found} counters, expected at least 3")]
    TooFewCounters { found: usize },
    #[error("footer counter '{0}' is out of range")]
    Overflow(String),
}

/// Read the counters from the text of a post's trailing block.
///
/// Counting starts at the rightmost like marker.
///
/// # Errors
///
/// Returns an error when the marker is missing or fewer than three
/// integers follow it.
pub fn extract_footer_counts(text: &str) -> Result<FooterCounts, FooterError> {
    let pos = text.rfind(LIKE_MARKER).ok_or(FooterError::MissingLikeMarker)?;
    let footer = &text[pos..];

    let numbers: Vec<&str> = NUMBER.find_iter(footer).map(|m| m.as_str()).collect();
    if numbers.len() < 3 {
        return Err(FooterError::TooFewCounters {
            found: numbers.len(),
        });
    }

    let parse = |digits: &str| {
        digits
            .parse::<u64>()
            .map_err(|_| FooterError::Overflow(digits.to_string()))
    };

    Ok(FooterCounts {
        up: parse(numbers[0])?,
        retweet: parse(numbers[1])?,
        comment: parse(numbers[2])?,
    })
}
