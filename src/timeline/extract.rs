//! Turning one listing entry into a finished [`Post`].

use thiserror::Error;
use tracing::debug;

use super::content::{original_content, repost_content};
use super::endpoints::Endpoints;
use super::entry::ListingEntry;
use super::footer::{extract_footer_counts, FooterError};
use super::media::{attached_picture, repost_target_id, resolve_pictures, resolve_video};
use super::model::{Post, PostKind};
use super::time::{normalize_publish_time, split_time_and_source, Clock, TimeError};
use crate::fetch::Fetcher;
use crate::parse::TextNormalizer;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("post {id} has no time line")]
    MissingTime { id: String },
    #[error("post {id}: {source}")]
    Time {
        id: String,
        #[source]
        source: TimeError,
    },
    #[error("post {id}: {source}")]
    Footer {
        id: String,
        #[source]
        source: FooterError,
    },
    #[error("post {id} has no like marker in its trailing block")]
    MissingLikeMarker { id: String },
    #[error("post {id} links pictures but the listing shows none")]
    PicturesHidden { id: String },
}

impl ExtractError {
    /// Whether the error invalidates the rest of the run rather than one post.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PicturesHidden { .. })
    }
}

/// Collaborators needed while extracting posts.
#[derive(Clone, Copy)]
pub struct ExtractContext<'a> {
    pub fetcher: &'a Fetcher,
    pub endpoints: &'a Endpoints,
    pub normalizer: TextNormalizer,
    pub clock: &'a dyn Clock,
}

/// Extract every field of `entry`, issuing secondary fetches as needed.
///
/// # Errors
///
/// Returns an error if a required field cannot be read. Only
/// [`ExtractError::is_fatal`] errors should stop the run.
pub async fn extract_post(ctx: &ExtractContext<'_>, entry: &ListingEntry) -> Result<Post, ExtractError> {
    let id = entry.id.clone();

    let time_line = entry
        .time_text
        .as_deref()
        .ok_or_else(|| ExtractError::MissingTime { id: id.clone() })?;
    let (raw_time, tool) = split_time_and_source(time_line);
    let publish_time =
        normalize_publish_time(raw_time, ctx.clock.now()).map_err(|source| ExtractError::Time {
            id: id.clone(),
            source,
        })?;
    let counts = extract_footer_counts(&entry.last_block_text).map_err(|source| ExtractError::Footer {
        id: id.clone(),
        source,
    })?;

    let kind = entry.kind();
    let (content, original_pictures, retweet_pictures, video_url) = match kind {
        PostKind::Original => {
            let content = original_content(ctx, entry).await;
            let pictures = resolve_pictures(ctx, entry, &id).await?;
            let video = resolve_video(ctx, entry).await;
            (content, pictures, Vec::new(), video)
        }
        PostKind::Repost => {
            let content = repost_content(ctx, entry).await?;
            let cited = match entry
                .citation_href
                .as_deref()
                .and_then(|href| repost_target_id(ctx.endpoints, href))
            {
                Some(target) => resolve_pictures(ctx, entry, &target).await?,
                None => Vec::new(),
            };
            let attached = attached_picture(entry).into_iter().collect();
            (content, attached, cited, None)
        }
    };

    debug!(
        post_id = %id,
        kind = ?kind,
        publish_time = %publish_time,
        pictures = original_pictures.len() + retweet_pictures.len(),
        video = video_url.is_some(),
        "Extracted post"
    );

    Ok(Post {
        url: ctx.endpoints.post_url(&id),
        overview: content.overview,
        kind,
        original_user: content.original_user,
        retweet_reason: content.retweet_reason,
        content: content.content,
        original_pictures,
        retweet_pictures,
        video_url,
        publish_place: entry.place.clone(),
        publish_time,
        publish_tool: tool.map(str::to_string),
        up_num: counts.up,
        retweet_num: counts.retweet,
        comment_num: counts.comment,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BackoffPolicy;
    use crate::timeline::entry::fixtures;
    use crate::timeline::model::OriginalAuthor;
    use crate::timeline::time::FixedClock;
    use chrono::NaiveDate;
    use scraper::{Html, Selector};
    use std::time::Duration;

    fn entry(html: &str) -> ListingEntry {
        let doc = Html::parse_fragment(html);
        let selector = Selector::parse("div.c").unwrap();
        ListingEntry::from_element(doc.select(&selector).next().unwrap(), &TextNormalizer::default())
            .unwrap()
    }

    async fn extract(entry: &ListingEntry) -> Result<Post, ExtractError> {
        let fetcher = Fetcher::new("SUB=x", BackoffPolicy::default(), Duration::from_secs(1)).unwrap();
        // Unroutable origin: any secondary fetch would fail, and these
        // fixtures need none.
        let endpoints = Endpoints::new(1_669_879_400, "https://weibo.cn", "m.weibo.cn");
        let clock = FixedClock(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        );
        let ctx = ExtractContext {
            fetcher: &fetcher,
            endpoints: &endpoints,
            normalizer: TextNormalizer::default(),
            clock: &clock,
        };
        extract_post(&ctx, entry).await
    }

    #[tokio::test]
    async fn test_plain_original() {
        let e = entry(&fixtures::original("Abc", "今天天气不错", "", (3, 5, 7)));
        let post = extract(&e).await.unwrap();
        assert_eq!(post.id, "Abc");
        assert_eq!(post.url, "https://weibo.com/1669879400/Abc");
        assert_eq!(post.content, "今天天气不错");
        assert_eq!(post.overview, post.content);
        assert_eq!(post.original_user, OriginalAuthor::Own);
        assert_eq!(post.publish_time, "2024-05-01 08:31");
        assert_eq!(post.publish_tool.as_deref(), Some("iPhone客户端"));
        assert_eq!((post.up_num, post.retweet_num, post.comment_num), (3, 5, 7));
        assert!(post.original_pictures.is_empty());
        assert_eq!(post.video_url, None);
    }

    #[tokio::test]
    async fn test_single_inline_picture() {
        let lead = r#"<a href="https://weibo.cn/mblog/pic/Abc?rl=0"><img src="https://wx1.sinaimg.cn/wap180/p1.jpg" alt="图片"/></a>"#;
        let e = entry(&fixtures::original("Abc", "晒图", lead, (0, 0, 0)));
        let post = extract(&e).await.unwrap();
        assert_eq!(post.original_pictures, vec!["https://wx1.sinaimg.cn/large/p1.jpg"]);
    }

    #[tokio::test]
    async fn test_hidden_pictures_are_fatal() {
        let lead = r#"<a href="https://weibo.cn/mblog/pic/Abc?rl=0">图片</a>"#;
        let e = entry(&fixtures::original("Abc", "晒图", lead, (0, 0, 0)));
        let err = extract(&e).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_repost_fields() {
        let e = entry(&fixtures::repost("R1", "S1", "原作者", "原文内容", "说得好"));
        let post = extract(&e).await.unwrap();
        assert_eq!(post.kind, PostKind::Repost);
        assert_eq!(post.original_user, OriginalAuthor::User("原作者".to_string()));
        assert_eq!(post.content, "原文内容");
        assert_eq!(post.retweet_reason, "说得好");
        assert_eq!(
            post.overview,
            "说得好\noriginal user: 原作者\nretweeted content: 原文内容"
        );
        assert_eq!(post.publish_time, "2024-05-01 09:30");
        assert_eq!(post.publish_tool.as_deref(), Some("微博 weibo.com"));
        assert_eq!((post.up_num, post.retweet_num, post.comment_num), (1, 0, 2));
        assert!(post.retweet_pictures.is_empty());
        assert!(post.original_pictures.is_empty());
    }

    #[tokio::test]
    async fn test_repost_of_deleted_post() {
        let html = r#"<div class="c" id="M_R2"><div><span class="cmt">转发了微博:</span><span class="ctt">抱歉，此微博已被作者删除。</span></div><div><span class="cmt">赞[0]</span><span class="cmt">原文转发[0]</span><span class="cmt">原文评论[0]</span></div><div><span class="cmt">转发理由:</span>可惜&nbsp;<a href="https://wx3.sinaimg.cn/large/own.png">图片</a>&nbsp;<a href="https://weibo.cn/attitude/R2/add">赞[4]</a>&nbsp;<a>转发[5]</a>&nbsp;<a class="cc">评论[6]</a>&nbsp;<span class="ct">2023-12-24 18:00:01&nbsp;来自网页</span></div></div>"#;
        let post = extract(&entry(html)).await.unwrap();
        assert_eq!(post.original_user, OriginalAuthor::Deleted);
        assert_eq!(post.content, "retweeted post was deleted");
        assert_eq!(post.retweet_reason, "可惜\u{a0}图片");
        assert_eq!(post.original_pictures, vec!["https://wx3.sinaimg.cn/large/own.png"]);
        assert_eq!(post.publish_time, "2023-12-24 18:00");
        assert_eq!((post.up_num, post.retweet_num, post.comment_num), (4, 5, 6));
    }

    #[tokio::test]
    async fn test_footer_with_too_few_counters() {
        let html = r#"<div class="c" id="M_F"><div><span class="ctt">x</span></div><div><a>赞[1]</a><span class="ct">刚刚</span></div></div>"#;
        let err = extract(&entry(html)).await.unwrap_err();
        assert!(matches!(err, ExtractError::Footer { .. }));
        assert!(!err.is_fatal());
    }
}
