//! Helpers shared by the integration tests.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use weibo_timeline::sink::{RecordSink, SinkBatch};

/// Summary of one batch a [`MemorySink`] received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBatch {
    pub start_index: usize,
    pub ids: Vec<String>,
}

/// Sink that keeps batch summaries in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<RecordedBatch>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn write_batch(&mut self, batch: &SinkBatch<'_>) -> Result<()> {
        self.batches.lock().unwrap().push(RecordedBatch {
            start_index: batch.start_index,
            ids: batch.posts.iter().map(|p| p.id.clone()).collect(),
        });
        Ok(())
    }
}
