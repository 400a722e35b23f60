//! Typed records produced by the extraction pipeline.

use serde::Serialize;

use crate::config::TimelineOrder;
use crate::constants::{DELETED_SENTINEL, NONE_SENTINEL, ORIGINAL_SENTINEL};

/// Whether a listing entry was authored by the profile owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Original,
    Repost,
}

/// Author of the content a post carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginalAuthor {
    /// The profile owner wrote it.
    Own,
    /// Reposted from this user.
    User(String),
    /// Reposted, but the source post is gone.
    Deleted,
}

impl OriginalAuthor {
    #[must_use]
    pub fn as_sentinel(&self) -> &str {
        match self {
            Self::Own => ORIGINAL_SENTINEL,
            Self::User(name) => name,
            Self::Deleted => DELETED_SENTINEL,
        }
    }
}

/// One extracted timeline entry.
///
/// Built completely before it is appended to a [`RunState`] and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub url: String,
    pub overview: String,
    pub kind: PostKind,
    pub original_user: OriginalAuthor,
    pub retweet_reason: String,
    pub content: String,
    pub original_pictures: Vec<String>,
    pub retweet_pictures: Vec<String>,
    pub video_url: Option<String>,
    pub publish_place: Option<String>,
    pub publish_time: String,
    pub publish_tool: Option<String>,
    pub up_num: u64,
    pub retweet_num: u64,
    pub comment_num: u64,
}

impl Post {
    #[must_use]
    pub fn is_original(&self) -> bool {
        self.kind == PostKind::Original
    }

    /// Flat representation with the sentinel strings sinks write.
    #[must_use]
    pub fn to_record(&self) -> PostRecord {
        PostRecord {
            id: self.id.clone(),
            url: self.url.clone(),
            overview: self.overview.clone(),
            is_original: self.is_original(),
            original_user: self.original_user.as_sentinel().to_string(),
            retweet_reason: self.retweet_reason.clone(),
            content: self.content.clone(),
            original_pictures: join_or_none(&self.original_pictures),
            retweet_pictures: join_or_none(&self.retweet_pictures),
            video_url: or_none(self.video_url.as_deref()),
            publish_place: or_none(self.publish_place.as_deref()),
            publish_time: self.publish_time.clone(),
            publish_tool: or_none(self.publish_tool.as_deref()),
            up_num: self.up_num,
            retweet_num: self.retweet_num,
            comment_num: self.comment_num,
        }
    }
}

/// Sink-facing form of a [`Post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: String,
    pub url: String,
    pub overview: String,
    pub is_original: bool,
    pub original_user: String,
    pub retweet_reason: String,
    pub content: String,
    pub original_pictures: String,
    pub retweet_pictures: String,
    pub video_url: String,
    pub publish_place: String,
    pub publish_time: String,
    pub publish_tool: String,
    pub up_num: u64,
    pub retweet_num: u64,
    pub comment_num: u64,
}

fn join_or_none(urls: &[String]) -> String {
    if urls.is_empty() {
        NONE_SENTINEL.to_string()
    } else {
        urls.join(",")
    }
}

fn or_none(value: Option<&str>) -> String {
    value.unwrap_or(NONE_SENTINEL).to_string()
}

/// Profile metadata shown alongside the timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: u64,
    pub nickname: String,
    pub post_count: u64,
    pub following: u64,
    pub followers: u64,
}

/// Posts extracted from one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// In the order they were appended to the run.
    pub posts: Vec<Post>,
    /// The listing links to a further page.
    pub has_more: bool,
}

/// Everything accumulated during one run.
///
/// Posts are only ever appended. `flushed` is the low-water mark: posts
/// before it have already been handed to the sinks.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    profile: UserProfile,
    posts: Vec<Post>,
    flushed: usize,
}

impl RunState {
    #[must_use]
    pub fn new(user_id: u64) -> Self {
        Self {
            profile: UserProfile {
                user_id,
                ..UserProfile::default()
            },
            posts: Vec::new(),
            flushed: 0,
        }
    }

    #[must_use]
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut UserProfile {
        &mut self.profile
    }

    pub fn push(&mut self, post: Post) {
        self.posts.push(post);
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Low-water mark.
    #[must_use]
    pub fn flushed(&self) -> usize {
        self.flushed
    }

    /// Posts not yet handed to the sinks.
    #[must_use]
    pub fn pending(&self) -> &[Post] {
        &self.posts[self.flushed..]
    }

    /// Advance the low-water mark past everything accumulated so far.
    pub fn mark_flushed(&mut self) {
        self.flushed = self.posts.len();
    }

    /// The newest post collected: first when walking newest-first, last otherwise.
    #[must_use]
    pub fn newest(&self, order: TimelineOrder) -> Option<&Post> {
        match order {
            TimelineOrder::Descending => self.posts.first(),
            TimelineOrder::Ascending => self.posts.last(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_post(id: &str) -> Post {
    Post {
        id: id.to_string(),
        url: format!("https://weibo.com/1669879400/{id}"),
        overview: "hello".to_string(),
        kind: PostKind::Original,
        original_user: OriginalAuthor::Own,
        retweet_reason: String::new(),
        content: "hello".to_string(),
        original_pictures: Vec::new(),
        retweet_pictures: Vec::new(),
        video_url: None,
        publish_place: None,
        publish_time: "2024-05-01 10:00".to_string(),
        publish_tool: None,
        up_num: 1,
        retweet_num: 2,
        comment_num: 3,
    }
}
