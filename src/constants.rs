//! Shared constants used across the crawler.
//!
//! The marker strings are literal tokens rendered by the mobile site's
//! markup. Extraction heuristics search for them after text normalization,
//! so they must match the rendered text exactly.

/// User agent string sent with every request.
///
/// The legacy mobile interface serves its lightweight markup to phone
/// browsers, so we present as one.
pub const MOBILE_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";

/// Origin used to build canonical post URLs (`<origin>/<user_id>/<post_id>`).
pub const POST_URL_ORIGIN: &str = "https://weibo.com";

/// Account page where picture display can be switched back on.
pub const PICTURE_SETTINGS_URL: &str = "https://weibo.cn/account/customize/pic";

/// "Like" marker. Its rightmost occurrence starts the inline footer counters.
pub const LIKE_MARKER: &str = "赞";

/// Anchor text offering the untruncated body of a long post.
pub const FULL_TEXT_MARKER: &str = "全文";

/// End-of-content marker on a repost's permalink page.
pub const REPOST_ORIGINAL_MARKER: &str = "原文转发";

/// Separates the publish time from the publishing client ("from").
pub const SOURCE_MARKER: &str = "来自";

/// Anchor text of the location link attached to geotagged posts.
pub const SHOW_MAP_MARKER: &str = "显示地图";

/// Suffix of inline video anchors, which must not be mistaken for a place.
pub const VIDEO_ANCHOR_SUFFIX: &str = "视频";

/// Anchor text of the "next page" link in a listing's pagination block.
pub const NEXT_PAGE_MARKER: &str = "下页";

/// Nicknames produced when the info page is actually the login page.
pub const LOGIN_PAGE_NICKNAMES: &[&str] = &["登录 - 新", "新浪"];

/// Sentinel written for absent optional fields at the sink boundary.
pub const NONE_SENTINEL: &str = "none";

/// `original_user` sentinel for genuine originals.
pub const ORIGINAL_SENTINEL: &str = "original";

/// `original_user` sentinel for reposts whose source was removed.
pub const DELETED_SENTINEL: &str = "deleted";

/// Content recorded for a repost whose source was removed.
pub const DELETED_REPOST_CONTENT: &str = "retweeted post was deleted";
