//! Page-by-page traversal of a profile's timeline.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::endpoints::Endpoints;
use super::extract::{extract_post, ExtractContext, ExtractError};
use super::listing::{parse_listing, ListingPage};
use super::model::{PageResult, PostKind, RunState};
use super::profile::{is_login_title, nickname_from_title};
use super::time::{Clock, LocalClock};
use crate::config::{Config, TimelineOrder};
use crate::constants::PICTURE_SETTINGS_URL;
use crate::fetch::{FetchError, Fetcher};
use crate::parse::{page_title, parse_document, ParseError, TextNormalizer};
use crate::sink::{RecordSink, SinkBatch};

/// Pages walked between two extra pauses, drawn anew after each pause.
pub const PAGES_BETWEEN_PAUSES: RangeInclusive<u32> = 1..=5;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("the cookie is invalid or expired; log in again and update WEIBO_COOKIE")]
    LoginExpired,
    #[error(
        "post {post_id} has pictures the account hides; switch picture display on at {settings}",
        settings = PICTURE_SETTINGS_URL
    )]
    PicturesHidden { post_id: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to parse {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },
    #[error("unknown output charset '{0}'")]
    Charset(String),
}

/// Decides when to insert an extra pause between pages.
#[derive(Debug)]
pub struct PagePacer {
    rng: StdRng,
    pause: RangeInclusive<Duration>,
    pages_until_pause: u32,
    pages_since_pause: u32,
}

impl PagePacer {
    #[must_use]
    pub fn new(mut rng: StdRng, pause_min: Duration, pause_max: Duration) -> Self {
        let pages_until_pause = rng.gen_range(PAGES_BETWEEN_PAUSES);
        Self {
            rng,
            pause: pause_min..=pause_max.max(pause_min),
            pages_until_pause,
            pages_since_pause: 0,
        }
    }

    /// Pacer with a reproducible sequence of pauses.
    #[must_use]
    pub fn seeded(seed: u64, pause_min: Duration, pause_max: Duration) -> Self {
        Self::new(StdRng::seed_from_u64(seed), pause_min, pause_max)
    }

    #[must_use]
    pub fn from_entropy(pause_min: Duration, pause_max: Duration) -> Self {
        Self::new(StdRng::from_entropy(), pause_min, pause_max)
    }

    #[must_use]
    pub fn pages_until_pause(&self) -> u32 {
        self.pages_until_pause
    }

    /// Record a finished page; returns the pause to take before the next one.
    pub fn page_done(&mut self) -> Option<Duration> {
        self.pages_since_pause += 1;
        if self.pages_since_pause < self.pages_until_pause {
            return None;
        }

        self.pages_since_pause = 0;
        self.pages_until_pause = self.rng.gen_range(PAGES_BETWEEN_PAUSES);
        let (min, max) = (*self.pause.start(), *self.pause.end());
        if min == max {
            return Some(min);
        }
        Some(self.rng.gen_range(min..=max))
    }
}

/// Walks a profile's listing pages and feeds the sinks.
pub struct Crawler {
    config: Config,
    fetcher: Fetcher,
    endpoints: Endpoints,
    normalizer: TextNormalizer,
    clock: Arc<dyn Clock>,
    pacer: PagePacer,
    sinks: Vec<Box<dyn RecordSink>>,
    state: RunState,
}

impl Crawler {
    /// # Errors
    ///
    /// Returns an error if the configured output charset is unknown.
    pub fn new(config: Config, fetcher: Fetcher) -> Result<Self, CrawlError> {
        let normalizer = TextNormalizer::for_label(&config.output_charset)
            .ok_or_else(|| CrawlError::Charset(config.output_charset.clone()))?;

        Ok(Self {
            endpoints: Endpoints::from_config(&config),
            pacer: PagePacer::from_entropy(config.pause_min, config.pause_max),
            state: RunState::new(config.user_id),
            clock: Arc::new(LocalClock),
            sinks: Vec::new(),
            normalizer,
            fetcher,
            config,
        })
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn with_pacer(mut self, pacer: PagePacer) -> Self {
        self.pacer = pacer;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> RunState {
        self.state
    }

    /// Crawl the whole timeline.
    ///
    /// Posts reach the sinks every `flush_every_pages` pages and once more at
    /// the end. An expired login stops the run without flushing; hidden
    /// pictures stop it after flushing what was collected.
    ///
    /// # Errors
    ///
    /// Returns an error for the conditions that invalidate the rest of the run.
    pub async fn run(&mut self) -> Result<(), CrawlError> {
        let nickname = self.fetch_nickname().await?;
        self.state.profile_mut().nickname = nickname;

        let first = self.fetch_listing(1).await?;
        let page_count = first.page_count;
        match first.counts {
            Some(counts) => {
                let profile = self.state.profile_mut();
                profile.post_count = counts.posts;
                profile.following = counts.following;
                profile.followers = counts.followers;
            }
            None => warn!("Profile counters not found on the first page"),
        }
        info!(
            nickname = %self.state.profile().nickname,
            posts = self.state.profile().post_count,
            following = self.state.profile().following,
            followers = self.state.profile().followers,
            pages = page_count,
            "Profile loaded"
        );

        let pages: Vec<u32> = match self.config.order {
            TimelineOrder::Descending => (1..=page_count).collect(),
            TimelineOrder::Ascending => (1..=page_count).rev().collect(),
        };
        let total = pages.len();
        let mut first_page = Some(first);

        for (index, page) in pages.into_iter().enumerate() {
            let listing = match first_page.take_if(|_| page == 1) {
                Some(listing) => Ok(listing),
                None => self.fetch_listing(page).await,
            };

            match listing {
                Ok(listing) => {
                    let skipped = listing.skipped;
                    let result = match self.crawl_page(listing).await {
                        Ok(result) => result,
                        Err(e @ CrawlError::PicturesHidden { .. }) => {
                            error!(page, "Pictures are hidden for this account, stopping");
                            self.flush().await;
                            return Err(e);
                        }
                        Err(e) => return Err(e),
                    };
                    if !result.has_more && page < page_count {
                        warn!(page, pages = page_count, "Listing has no next-page link before the last page");
                    }
                    info!(
                        page,
                        index = index + 1,
                        total,
                        posts = result.posts.len(),
                        skipped,
                        collected = self.state.len(),
                        "Page done"
                    );
                }
                Err(CrawlError::LoginExpired) => return Err(CrawlError::LoginExpired),
                Err(e) => warn!(page, error = %e, "Skipping page"),
            }

            if (index + 1) % self.config.flush_every_pages.max(1) == 0 {
                self.flush().await;
            }

            if index + 1 < total {
                if let Some(pause) = self.pacer.page_done() {
                    debug!(secs = pause.as_secs_f64(), "Pausing between pages");
                    self.fetcher.sleeper().sleep(pause).await;
                }
            }
        }

        self.flush().await;
        Ok(())
    }

    async fn fetch_nickname(&self) -> Result<String, CrawlError> {
        let url = self.endpoints.info();
        let response = self.fetcher.fetch(&url).await?.error_for_status()?;
        let document =
            parse_document(&response.body).map_err(|source| CrawlError::Parse { url, source })?;
        let title = page_title(&document).unwrap_or_default();
        if is_login_title(&title) {
            error!("Info page is the login page");
            return Err(CrawlError::LoginExpired);
        }
        Ok(nickname_from_title(&title))
    }

    async fn fetch_listing(&self, page: u32) -> Result<ListingPage, CrawlError> {
        let url = self.endpoints.listing(page);
        let response = self.fetcher.fetch(&url).await?.error_for_status()?;
        let listing = parse_listing(&response.body, &self.normalizer)
            .map_err(|source| CrawlError::Parse { url, source })?;
        if listing.title.as_deref().is_some_and(is_login_title) {
            error!(page, "Listing page is the login page");
            return Err(CrawlError::LoginExpired);
        }
        Ok(listing)
    }

    async fn crawl_page(&mut self, listing: ListingPage) -> Result<PageResult, CrawlError> {
        let mut entries = listing.entries;
        if self.config.order == TimelineOrder::Ascending {
            entries.reverse();
        }

        let ctx = ExtractContext {
            fetcher: &self.fetcher,
            endpoints: &self.endpoints,
            normalizer: self.normalizer,
            clock: self.clock.as_ref(),
        };

        let mut posts = Vec::new();
        for entry in &entries {
            if self.config.only_original && entry.kind() == PostKind::Repost {
                continue;
            }
            match extract_post(&ctx, entry).await {
                Ok(post) => {
                    self.state.push(post.clone());
                    posts.push(post);
                }
                Err(ExtractError::PicturesHidden { id }) => {
                    return Err(CrawlError::PicturesHidden { post_id: id });
                }
                Err(e) => warn!(post_id = %entry.id, error = %e, "Skipping post"),
            }
        }

        Ok(PageResult {
            posts,
            has_more: listing.has_more,
        })
    }

    /// Hand everything past the low-water mark to the sinks.
    async fn flush(&mut self) {
        let pending = self.state.pending();
        if pending.is_empty() {
            return;
        }

        let batch = SinkBatch {
            profile: self.state.profile(),
            posts: pending,
            start_index: self.state.flushed(),
            only_original: self.config.only_original,
        };
        for sink in &mut self.sinks {
            if let Err(e) = sink.write_batch(&batch).await {
                warn!(sink = sink.name(), error = %format!("{e:#}"), "Sink failed to write batch");
            }
        }
        debug!(start = batch.start_index, count = batch.posts.len(), "Flushed posts");
        self.state.mark_flushed();
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("user_id", &self.config.user_id)
            .field("order", &self.config.order)
            .field("collected", &self.state.len())
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}
