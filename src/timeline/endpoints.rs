use url::Url;

use crate::config::Config;
use crate::constants::POST_URL_ORIGIN;

/// URL layout of the mobile site for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    user_id: u64,
    base: String,
    video_host: String,
}

impl Endpoints {
    #[must_use]
    pub fn new(user_id: u64, base: &str, video_host: &str) -> Self {
        Self {
            user_id,
            base: base.trim_end_matches('/').to_string(),
            video_host: video_host.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.user_id, &config.base_url, &config.video_host)
    }

    #[must_use]
    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// Listing page `page` (1-based) of the profile's timeline.
    #[must_use]
    pub fn listing(&self, page: u32) -> String {
        format!("{}/{}/profile?page={page}", self.base, self.user_id)
    }

    /// Profile info page, whose title carries the nickname.
    #[must_use]
    pub fn info(&self) -> String {
        format!("{}/{}/info", self.base, self.user_id)
    }

    /// Permalink of a post. `expand_all` requests the fully expanded variant.
    #[must_use]
    pub fn permalink(&self, post_id: &str, expand_all: bool) -> String {
        if expand_all {
            format!("{}/comment/{post_id}?ckAll=1", self.base)
        } else {
            format!("{}/comment/{post_id}", self.base)
        }
    }

    /// Link rendered on any post that carries at least one picture.
    #[must_use]
    pub fn first_picture(&self, post_id: &str) -> String {
        format!("{}/mblog/pic/{post_id}?rl=0", self.base)
    }

    /// Link rendered on posts with more than one picture.
    #[must_use]
    pub fn picture_gallery(&self, post_id: &str) -> String {
        format!("{}/mblog/picAll/{post_id}?rl=1", self.base)
    }

    /// Canonical public URL of a post.
    #[must_use]
    pub fn post_url(&self, post_id: &str) -> String {
        format!("{POST_URL_ORIGIN}/{}/{post_id}", self.user_id)
    }

    /// Resolve a possibly relative href against the site origin.
    #[must_use]
    pub fn resolve(&self, href: &str) -> Option<Url> {
        Url::parse(&format!("{}/", self.base)).ok()?.join(href).ok()
    }

    /// Substring identifying a video-show link.
    #[must_use]
    pub fn video_show_marker(&self) -> String {
        format!("{}/s/video/show?object_id=", self.video_host)
    }

    /// Rewrite a video-show link to its object-info API equivalent.
    #[must_use]
    pub fn video_object_url(&self, show_url: &str) -> String {
        show_url.replace(
            &format!("{}/s/video/show", self.video_host),
            &format!("{}/s/video/object", self.video_host),
        )
    }
}
