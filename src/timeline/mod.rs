//! Timeline crawling: listing pages in, typed posts out.

mod classify;
mod content;
mod crawler;
mod endpoints;
mod entry;
mod extract;
mod footer;
mod listing;
mod media;
mod model;
mod place;
mod profile;
mod time;

pub use classify::{classify, count_meta_spans, kind_for_meta_spans, ORIGINAL_MAX_META_SPANS};
pub use content::{before_rightmost, long_text_from_document, PostContent};
pub use crawler::{CrawlError, Crawler, PagePacer, PAGES_BETWEEN_PAUSES};
pub use endpoints::Endpoints;
pub use entry::{EntryError, ListingEntry};
pub use extract::{extract_post, ExtractContext, ExtractError};
pub use footer::{extract_footer_counts, FooterCounts, FooterError};
pub use listing::{parse_listing, ListingPage};
pub use media::{attached_picture, enlarge_preview, enlarge_thumbnail, repost_target_id};
pub use model::{OriginalAuthor, PageResult, Post, PostKind, PostRecord, RunState, UserProfile};
pub use place::publish_place;
pub use profile::{is_login_title, nickname_from_title, parse_page_count, parse_profile_counts, ProfileCounts};
pub use time::{normalize_publish_time, split_time_and_source, Clock, FixedClock, LocalClock, TimeError, TIMESTAMP_FORMAT};

#[cfg(test)]
pub(crate) use model::sample_post;
