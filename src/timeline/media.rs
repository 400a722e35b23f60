//! Picture and video URL resolution.

use serde::Deserialize;
use tracing::{debug, warn};

use super::endpoints::Endpoints;
use super::entry::ListingEntry;
use super::extract::{ExtractContext, ExtractError};
use crate::parse::parse_document;

const THUMBNAIL_SEGMENT: &str = "/thumb180/";
const PREVIEW_SEGMENT: &str = "/wap180/";
const LARGE_SEGMENT: &str = "/large/";

const IMAGE_EXTENSIONS: &[&str] = &[".gif", ".jpeg", ".jpg", ".png"];

static IMG_SELECTOR: std::sync::LazyLock<scraper::Selector> =
    std::sync::LazyLock::new(|| scraper::Selector::parse("img").unwrap());

/// Gallery thumbnail URL to full-size URL.
#[must_use]
pub fn enlarge_thumbnail(url: &str) -> String {
    url.replace(THUMBNAIL_SEGMENT, LARGE_SEGMENT)
}

/// Inline preview URL to full-size URL.
#[must_use]
pub fn enlarge_preview(url: &str) -> String {
    url.replace(PREVIEW_SEGMENT, LARGE_SEGMENT)
}

/// Full-size pictures of post `post_id` as linked from `entry`.
///
/// A failed gallery fetch yields no pictures; a post that links a picture
/// without rendering one means picture display is off for the account.
pub(crate) async fn resolve_pictures(
    ctx: &ExtractContext<'_>,
    entry: &ListingEntry,
    post_id: &str,
) -> Result<Vec<String>, ExtractError> {
    if !entry.links_to(&ctx.endpoints.first_picture(post_id)) {
        return Ok(Vec::new());
    }

    let gallery = ctx.endpoints.picture_gallery(post_id);
    if entry.links_to(&gallery) {
        return Ok(match gallery_pictures(ctx, &gallery).await {
            Ok(pictures) => pictures,
            Err(e) => {
                warn!(post_id = %post_id, url = %gallery, error = %e, "Failed to load picture gallery");
                Vec::new()
            }
        });
    }

    entry
        .image_srcs
        .last()
        .map(|src| vec![enlarge_preview(src)])
        .ok_or_else(|| ExtractError::PicturesHidden {
            id: entry.id.clone(),
        })
}

async fn gallery_pictures(ctx: &ExtractContext<'_>, url: &str) -> anyhow::Result<Vec<String>> {
    let response = ctx.fetcher.fetch(url).await?.error_for_status()?;
    let document = parse_document(&response.body)?;
    let pictures: Vec<String> = document
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .map(enlarge_thumbnail)
        .collect();
    debug!(url = %url, count = pictures.len(), "Resolved picture gallery");
    Ok(pictures)
}

/// Id of the post a repost cites, taken from its citation link.
#[must_use]
pub fn repost_target_id(endpoints: &Endpoints, citation_href: &str) -> Option<String> {
    let url = endpoints.resolve(citation_href)?;
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Picture the reposter attached to their own reason, if any.
#[must_use]
pub fn attached_picture(entry: &ListingEntry) -> Option<String> {
    entry
        .last_block_hrefs
        .iter()
        .find(|href| IMAGE_EXTENSIONS.iter().any(|ext| href.ends_with(*ext)))
        .cloned()
}

#[derive(Debug, Deserialize)]
struct VideoObjectResponse {
    data: VideoData,
}

#[derive(Debug, Deserialize)]
struct VideoData {
    object: VideoObject,
}

#[derive(Debug, Deserialize)]
struct VideoObject {
    stream: VideoStream,
}

#[derive(Debug, Default, Deserialize)]
struct VideoStream {
    hd_url: Option<String>,
    url: Option<String>,
}

impl VideoStream {
    /// High definition first. Neither being set means a live broadcast.
    fn preferred(self) -> Option<String> {
        self.hd_url
            .filter(|url| !url.is_empty())
            .or_else(|| self.url.filter(|url| !url.is_empty()))
    }
}

/// Playable video URL of an original post.
pub(crate) async fn resolve_video(ctx: &ExtractContext<'_>, entry: &ListingEntry) -> Option<String> {
    let marker = ctx.endpoints.video_show_marker();
    let show_url = entry
        .lead_block_hrefs
        .iter()
        .find(|href| href.contains(&marker))?;

    let object_url = ctx.endpoints.video_object_url(show_url);
    match ctx.fetcher.fetch_json::<VideoObjectResponse>(&object_url).await {
        Ok(response) => {
            let url = response.data.object.stream.preferred();
            if url.is_none() {
                debug!(post_id = %entry.id, "Video is a live broadcast");
            }
            url
        }
        Err(e) => {
            warn!(post_id = %entry.id, url = %object_url, error = %e, "Failed to resolve video");
            None
        }
    }
}
