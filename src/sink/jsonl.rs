use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{user_dir, RecordSink, SinkBatch};

/// Fields meaningless when only originals are collected.
const REPOST_ONLY_FIELDS: &[&str] = &["is_original", "retweet_reason", "original_user", "retweet_pictures"];

/// Appends one JSON object per post to `<output>/<nickname>/<user_id>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    output_dir: PathBuf,
}

impl JsonLinesSink {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn render(batch: &SinkBatch<'_>) -> Result<String> {
        let mut out = String::new();
        for post in batch.posts {
            let mut value = serde_json::to_value(post.to_record())
                .with_context(|| format!("Failed to serialize post {}", post.id))?;
            if batch.only_original {
                if let Some(object) = value.as_object_mut() {
                    for field in REPOST_ONLY_FIELDS {
                        object.remove(*field);
                    }
                }
            }
            out.push_str(&value.to_string());
            out.push('\n');
        }
        Ok(out)
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn write_batch(&mut self, batch: &SinkBatch<'_>) -> Result<()> {
        let dir = user_dir(&self.output_dir, batch.profile);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        let path = dir.join(format!("{}.jsonl", batch.profile.user_id));
        let lines = Self::render(batch)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(lines.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        file.flush().await?;

        info!(
            path = %path.display(),
            written = batch.posts.len(),
            total = batch.start_index + batch.posts.len(),
            "Wrote posts"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{sample_post, UserProfile};

    fn profile() -> UserProfile {
        UserProfile {
            user_id: 1_669_879_400,
            nickname: "测试用户".to_string(),
            post_count: 3,
            following: 1,
            followers: 2,
        }
    }

    #[tokio::test]
    async fn test_batches_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonLinesSink::new(dir.path());
        let profile = profile();

        let first = vec![sample_post("a"), sample_post("b")];
        let second = vec![sample_post("c")];
        for (start_index, posts) in [(0, &first), (2, &second)] {
            sink.write_batch(&SinkBatch {
                profile: &profile,
                posts,
                start_index,
                only_original: false,
            })
            .await
            .unwrap();
        }

        let path = dir.path().join("测试用户").join("1669879400.jsonl");
        let contents = std::fs::read_to_string(path).unwrap();
        let records: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["id"], "c");
        assert_eq!(records[0]["original_user"], "original");
        assert_eq!(records[0]["video_url"], "none");
        assert_eq!(records[0]["up_num"], 1);
    }

    #[tokio::test]
    async fn test_only_original_drops_repost_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonLinesSink::new(dir.path());
        let profile = profile();
        let posts = vec![sample_post("a")];
        sink.write_batch(&SinkBatch {
            profile: &profile,
            posts: &posts,
            start_index: 0,
            only_original: true,
        })
        .await
        .unwrap();

        let path = dir.path().join("测试用户").join("1669879400.jsonl");
        let record: serde_json::Value =
            serde_json::from_str(std::fs::read_to_string(path).unwrap().trim()).unwrap();
        assert!(record.get("retweet_reason").is_none());
        assert!(record.get("is_original").is_none());
        assert_eq!(record["content"], "hello");
    }
}
