//! Outbound feed writer seam.
//!
//! The append-only log transport is an external collaborator; the host
//! only needs the append primitive. [`MemoryFeedWriter`] is the in-memory
//! implementation used by tests and local tooling.

use crate::{HostResult, WriteReceipt};
use async_trait::async_trait;
use std::sync::Mutex;
use weft_types::{FeedKey, FeedMessage};

/// Write-append primitive over the outbound log.
#[async_trait]
pub trait FeedWriter: Send + Sync {
    /// Appends one record; resolves once the record is durably sequenced.
    async fn append(&self, message: &FeedMessage) -> HostResult<WriteReceipt>;
}

/// In-memory feed writer: sequences records into a vector.
#[derive(Debug)]
pub struct MemoryFeedWriter {
    feed_key: FeedKey,
    records: Mutex<Vec<FeedMessage>>,
}

impl MemoryFeedWriter {
    /// Creates a writer with a fresh feed key.
    #[must_use]
    pub fn new() -> Self {
        Self::with_key(FeedKey::new())
    }

    /// Creates a writer over an existing feed key.
    #[must_use]
    pub fn with_key(feed_key: FeedKey) -> Self {
        Self {
            feed_key,
            records: Mutex::new(Vec::new()),
        }
    }

    /// The feed key this writer appends under.
    #[must_use]
    pub fn feed_key(&self) -> FeedKey {
        self.feed_key
    }

    /// All records appended so far, in sequence order.
    #[must_use]
    pub fn records(&self) -> Vec<FeedMessage> {
        self.records.lock().expect("feed lock poisoned").clone()
    }

    /// Number of appended records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().expect("feed lock poisoned").len()
    }

    /// Returns true if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().expect("feed lock poisoned").is_empty()
    }
}

impl Default for MemoryFeedWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedWriter for MemoryFeedWriter {
    async fn append(&self, message: &FeedMessage) -> HostResult<WriteReceipt> {
        let mut records = self.records.lock().expect("feed lock poisoned");
        records.push(message.clone());
        Ok(WriteReceipt {
            feed_key: self.feed_key,
            seq: records.len() as u64 - 1,
        })
    }
}
