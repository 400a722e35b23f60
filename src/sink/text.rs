use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use encoding_rs::Encoding;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{user_dir, RecordSink, SinkBatch};

/// Appends a readable report to `<output>/<nickname>/<user_id>.txt`,
/// encoded in the output charset.
#[derive(Debug, Clone)]
pub struct TextSink {
    output_dir: PathBuf,
    encoding: &'static Encoding,
}

impl TextSink {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, encoding: &'static Encoding) -> Self {
        Self {
            output_dir: output_dir.into(),
            encoding,
        }
    }

    fn render(batch: &SinkBatch<'_>) -> String {
        let mut out = String::new();
        let profile = batch.profile;

        if batch.start_index == 0 {
            let _ = write!(
                out,
                "User info\nNickname: {}\nUser id: {}\nPosts: {}\nFollowing: {}\nFollowers: {}\n\n\n{}\n",
                profile.nickname,
                profile.user_id,
                profile.post_count,
                profile.following,
                profile.followers,
                if batch.only_original {
                    "Original posts:"
                } else {
                    "Posts:"
                }
            );
        }

        for (offset, post) in batch.posts.iter().enumerate() {
            let record = post.to_record();
            let _ = write!(
                out,
                "{}:{}\nPlace: {}\nPublished: {}\nLikes: {}   Reposts: {}   Comments: {}\nTool: {}\n\n",
                batch.start_index + offset + 1,
                record.overview,
                record.publish_place,
                record.publish_time,
                record.up_num,
                record.retweet_num,
                record.comment_num,
                record.publish_tool,
            );
        }
        out
    }
}

#[async_trait]
impl RecordSink for TextSink {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn write_batch(&mut self, batch: &SinkBatch<'_>) -> Result<()> {
        let dir = user_dir(&self.output_dir, batch.profile);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        let path = dir.join(format!("{}.txt", batch.profile.user_id));
        let report = Self::render(batch);
        let (bytes, _, _) = self.encoding.encode(&report);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        file.flush().await?;

        info!(path = %path.display(), written = batch.posts.len(), "Wrote report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{sample_post, UserProfile};

    #[tokio::test]
    async fn test_header_once_and_global_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = TextSink::new(dir.path(), encoding_rs::UTF_8);
        let profile = UserProfile {
            user_id: 7,
            nickname: "nick".to_string(),
            post_count: 3,
            following: 4,
            followers: 5,
        };

        let first = vec![sample_post("a"), sample_post("b")];
        let second = vec![sample_post("c")];
        for (start_index, posts) in [(0, &first), (2, &second)] {
            sink.write_batch(&SinkBatch {
                profile: &profile,
                posts,
                start_index,
                only_original: true,
            })
            .await
            .unwrap();
        }

        let report = std::fs::read_to_string(dir.path().join("nick").join("7.txt")).unwrap();
        assert_eq!(report.matches("User info").count(), 1);
        assert!(report.contains("Original posts:"));
        assert!(report.contains("\n1:hello\n"));
        assert!(report.contains("\n3:hello\nPlace: none\n"));
        assert!(report.contains("Likes: 1   Reposts: 2   Comments: 3"));
    }

    #[tokio::test]
    async fn test_report_is_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = TextSink::new(dir.path(), encoding_rs::GBK);
        let profile = UserProfile {
            user_id: 7,
            nickname: "微博".to_string(),
            ..UserProfile::default()
        };
        let posts = vec![sample_post("a")];
        sink.write_batch(&SinkBatch {
            profile: &profile,
            posts: &posts,
            start_index: 0,
            only_original: false,
        })
        .await
        .unwrap();

        let bytes = std::fs::read(dir.path().join("微博").join("7.txt")).unwrap();
        let (decoded, _, had_errors) = encoding_rs::GBK.decode(&bytes);
        assert!(!had_errors);
        assert!(decoded.contains("Nickname: 微博"));
    }
}
