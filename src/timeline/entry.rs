//! Owned snapshot of one listing entry.
//!
//! `scraper::Html` is not `Send`, so everything the extraction stages need
//! is read out of the element up front and the document can be dropped
//! before any secondary fetch is awaited.

use scraper::{ElementRef, Selector};
use thiserror::Error;

use super::classify::count_meta_spans;
use super::classify::kind_for_meta_spans;
use super::model::PostKind;
use super::place::publish_place;
use crate::parse::{child_elements, has_exact_class, own_text, TextNormalizer};

/// Length of the prefix (`M_`) in front of the post id in element ids.
const ENTRY_ID_PREFIX_LEN: usize = 2;

static ANCHOR_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("a").unwrap());
static IMG_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("img").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry has no usable id attribute")]
    MissingId,
    #[error("entry {0} has no content blocks")]
    NoBlocks(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub id: String,
    pub meta_spans: usize,
    /// Normalized text of the whole entry.
    pub text: String,
    /// Own text of every anchor inside the entry's blocks.
    pub anchor_texts: Vec<String>,
    /// Hrefs of anchors that are direct children of a block.
    pub anchor_hrefs: Vec<String>,
    /// Hrefs of every anchor inside the first block.
    pub lead_block_hrefs: Vec<String>,
    /// Link to the reposted post, when there is one.
    pub citation_href: Option<String>,
    /// Reposted author as shown in the attribution line.
    pub attribution_user: Option<String>,
    pub last_block_text: String,
    pub last_block_hrefs: Vec<String>,
    pub image_srcs: Vec<String>,
    /// Normalized time-and-source line.
    pub time_text: Option<String>,
    pub place: Option<String>,
}

impl ListingEntry {
    /// Snapshot a `div.c` listing entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the element has no id or no child blocks.
    pub fn from_element(
        element: ElementRef<'_>,
        normalizer: &TextNormalizer,
    ) -> Result<Self, EntryError> {
        let id = element
            .value()
            .attr("id")
            .and_then(|raw| raw.get(ENTRY_ID_PREFIX_LEN..))
            .filter(|id| !id.is_empty())
            .ok_or(EntryError::MissingId)?
            .to_string();

        let blocks: Vec<ElementRef<'_>> = child_elements(element, "div").collect();
        let (Some(lead), Some(last)) = (blocks.first().copied(), blocks.last().copied()) else {
            return Err(EntryError::NoBlocks(id));
        };

        let anchor_texts = blocks
            .iter()
            .flat_map(|block| block.select(&ANCHOR_SELECTOR))
            .map(|a| own_text(&a).trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();

        let direct_anchors = || blocks.iter().flat_map(|block| child_elements(*block, "a"));

        let anchor_hrefs = direct_anchors().filter_map(href).collect();
        let citation_href = direct_anchors()
            .find(|a| has_exact_class(a, "cc"))
            .and_then(href);

        let attribution_user = blocks
            .iter()
            .flat_map(|block| child_elements(*block, "span"))
            .filter(|span| has_exact_class(span, "cmt"))
            .flat_map(|span| child_elements(span, "a"))
            .map(|a| own_text(&a).trim().to_string())
            .find(|name| !name.is_empty());

        let time_text = blocks
            .iter()
            .flat_map(|block| child_elements(*block, "span"))
            .find(|span| has_exact_class(span, "ct"))
            .map(|span| normalizer.normalize(&span));

        Ok(Self {
            meta_spans: count_meta_spans(element),
            text: normalizer.normalize(&element),
            anchor_texts,
            anchor_hrefs,
            lead_block_hrefs: lead.select(&ANCHOR_SELECTOR).filter_map(href).collect(),
            citation_href,
            attribution_user,
            last_block_text: normalizer.normalize(&last),
            last_block_hrefs: child_elements(last, "a").filter_map(href).collect(),
            image_srcs: element
                .select(&IMG_SELECTOR)
                .filter_map(|img| img.value().attr("src").map(str::to_string))
                .collect(),
            time_text,
            place: publish_place(lead, normalizer),
            id,
        })
    }

    #[must_use]
    pub fn kind(&self) -> PostKind {
        kind_for_meta_spans(self.meta_spans)
    }

    /// Whether one of the anchors offers the untruncated text.
    #[must_use]
    pub fn has_anchor_text(&self, text: &str) -> bool {
        self.anchor_texts.iter().any(|t| t == text)
    }

    #[must_use]
    pub fn links_to(&self, url: &str) -> bool {
        self.anchor_hrefs.iter().any(|href| href == url)
    }
}

fn href(anchor: ElementRef<'_>) -> Option<String> {
    anchor.value().attr("href").map(str::to_string)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Listing markup shaped like the mobile site's.

    /// An original post with the given body and footer counters.
    pub fn original(id: &str, body: &str, extra_lead: &str, counts: (u64, u64, u64)) -> String {
        let (up, rt, cm) = counts;
        format!(
            r#"<div class="c" id="M_{id}"><div><span class="ctt">{body}</span>{extra_lead}</div><div><a href="https://weibo.cn/attitude/{id}/add">赞[{up}]</a>&nbsp;<a href="https://weibo.cn/repost/{id}">转发[{rt}]</a>&nbsp;<a class="cc" href="https://weibo.cn/comment/{id}">评论[{cm}]</a>&nbsp;<a href="https://weibo.cn/fav/addFav/{id}">收藏</a>&nbsp;<span class="ct">今天 08:31&nbsp;来自iPhone客户端</span></div></div>"#
        )
    }

    /// A repost of `source_id` by `author`, with the reposter's reason.
    pub fn repost(id: &str, source_id: &str, author: &str, body: &str, reason: &str) -> String {
        format!(
            r#"<div class="c" id="M_{id}"><div><span class="cmt">转发了&nbsp;<a href="https://weibo.cn/u/2">{author}</a>&nbsp;的微博:</span><span class="ctt">{body}</span>&nbsp;</div><div><span class="cmt">赞[10]</span>&nbsp;<span class="cmt">原文转发[20]</span>&nbsp;<a class="cc" href="https://weibo.cn/comment/{source_id}?rl=1#cmtfrm">原文评论[30]</a></div><div><span class="cmt">转发理由:</span>{reason}&nbsp;&nbsp;<a href="https://weibo.cn/attitude/{id}/add">赞[1]</a>&nbsp;<a href="https://weibo.cn/repost/{id}">转发[0]</a>&nbsp;<a class="cc" href="https://weibo.cn/comment/{id}">评论[2]</a>&nbsp;<span class="ct">05月01日 09:30&nbsp;来自微博 weibo.com</span></div></div>"#
        )
    }
}
