//! Persistence of extracted posts.
//!
//! The crawler hands each sink the posts accumulated since the previous
//! handoff. Sinks append; they never see a post twice.

mod jsonl;
mod text;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

pub use jsonl::JsonLinesSink;
pub use text::TextSink;

use crate::timeline::{Post, UserProfile};

/// Posts handed to the sinks in one flush.
#[derive(Debug, Clone, Copy)]
pub struct SinkBatch<'a> {
    pub profile: &'a UserProfile,
    /// Posts since the previous flush, in run order.
    pub posts: &'a [Post],
    /// Run-wide index of `posts[0]`.
    pub start_index: usize,
    pub only_original: bool,
}

/// Destination for extracted posts.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Append one batch.
    async fn write_batch(&mut self, batch: &SinkBatch<'_>) -> Result<()>;
}

/// Directory holding everything written for one profile.
#[must_use]
pub fn user_dir(output_dir: &Path, profile: &UserProfile) -> PathBuf {
    let name = if profile.nickname.trim().is_empty() {
        profile.user_id.to_string()
    } else {
        profile
            .nickname
            .trim()
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect()
    };
    output_dir.join(name)
}
