//! Downloading a run's pictures and videos to disk.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::constants::MOBILE_USER_AGENT;
use crate::timeline::Post;

/// Attempts per file before it is recorded as not downloaded.
pub const MAX_ATTEMPTS: u32 = 5;

const FAILURE_LOG: &str = "not_downloaded.txt";
const DEFAULT_PICTURE_EXTENSION: &str = ".jpg";
const VIDEO_EXTENSION: &str = ".mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Picture,
    Video,
}

impl MediaKind {
    /// Subdirectory of the user directory the files go to.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Picture => "img",
            Self::Video => "video",
        }
    }
}

/// One file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub post_id: String,
    pub url: String,
    pub file_name: String,
}

/// Outcome counts of a download pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Files to download for `posts`, named `YYYYMMDD_<id>[_<n>]<ext>`.
///
/// Posts with several pictures number them from 1.
#[must_use]
pub fn plan_downloads(posts: &[Post], kind: MediaKind) -> Vec<PlannedFile> {
    let mut planned = Vec::new();
    for post in posts {
        let prefix = format!("{}_{}", date_stamp(&post.publish_time), post.id);
        match kind {
            MediaKind::Video => {
                if let Some(url) = &post.video_url {
                    planned.push(PlannedFile {
                        post_id: post.id.clone(),
                        url: url.clone(),
                        file_name: format!("{prefix}{VIDEO_EXTENSION}"),
                    });
                }
            }
            MediaKind::Picture => {
                let numbered = post.original_pictures.len() > 1;
                for (i, url) in post.original_pictures.iter().enumerate() {
                    let file_name = if numbered {
                        format!("{prefix}_{}{}", i + 1, url_extension(url))
                    } else {
                        format!("{prefix}{}", url_extension(url))
                    };
                    planned.push(PlannedFile {
                        post_id: post.id.clone(),
                        url: url.clone(),
                        file_name,
                    });
                }
            }
        }
    }
    planned
}

/// `YYYYMMDD` from a normalized `YYYY-MM-DD HH:MM` timestamp.
fn date_stamp(publish_time: &str) -> String {
    publish_time
        .chars()
        .take(10)
        .filter(char::is_ascii_digit)
        .collect()
}

/// Extension (with the dot) of the URL's last path segment.
fn url_extension(url: &str) -> String {
    let path = url::Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string());
    let segment = path.rsplit('/').next().unwrap_or_default();
    Path::new(segment)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or_else(|| DEFAULT_PICTURE_EXTENSION.to_string(), |ext| format!(".{ext}"))
}

/// Fetches media files with a bounded number of attempts each.
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    client: Client,
    max_attempts: u32,
}

impl MediaDownloader {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(MOBILE_USER_AGENT)
            .build()
            .context("Failed to build download client")?;
        Ok(Self {
            client,
            max_attempts: MAX_ATTEMPTS,
        })
    }

    /// Download every `kind` file of `posts` into `<user_dir>/<kind dir>/`.
    ///
    /// Files already on disk are kept. Files that fail every attempt are
    /// listed in `not_downloaded.txt` and do not stop the pass.
    ///
    /// # Errors
    ///
    /// Returns an error only if the target directory or the failure log
    /// cannot be written.
    pub async fn download_all(&self, posts: &[Post], kind: MediaKind, user_dir: &Path) -> Result<DownloadReport> {
        let dir = user_dir.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media directory: {}", dir.display()))?;

        let planned = plan_downloads(posts, kind);
        let total = planned.len();
        info!(kind = ?kind, total, dir = %dir.display(), "Starting media download");

        let mut report = DownloadReport::default();
        for (n, file) in planned.iter().enumerate() {
            let path = dir.join(&file.file_name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                report.existing += 1;
                continue;
            }

            match self.download_one(&file.url, &path).await {
                Ok(bytes) => {
                    report.downloaded += 1;
                    info!(progress = %format!("{}/{total}", n + 1), file = %file.file_name, bytes, "Downloaded");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(post_id = %file.post_id, url = %file.url, error = %format!("{e:#}"), "Download failed");
                    record_failure(&dir, file).await?;
                }
            }
        }

        info!(kind = ?kind, downloaded = report.downloaded, existing = report.existing, failed = report.failed, "Media download finished");
        Ok(report)
    }

    async fn download_one(&self, url: &str, path: &Path) -> Result<usize> {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match self.fetch_bytes(url).await {
                Ok(bytes) => {
                    tokio::fs::write(path, &bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    return Ok(bytes.len());
                }
                Err(e) => {
                    debug!(url = %url, attempt, error = %format!("{e:#}"), "Download attempt failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no download attempts made")))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .context("Request failed")?
            .error_for_status()
            .context("Download returned error")?
            .bytes()
            .await
            .context("Failed to read body")?;
        Ok(bytes.to_vec())
    }
}

async fn record_failure(dir: &Path, file: &PlannedFile) -> Result<()> {
    let path = dir.join(FAILURE_LOG);
    let mut log = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    log.write_all(format!("{}:{}\n", file.post_id, file.url).as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
