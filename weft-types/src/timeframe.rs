//! Timeframes: per-feed high-water marks.
//!
//! A timeframe records the highest sequence number seen from each writer
//! feed at the moment a mutation was authored. It is the logical timestamp
//! carried as delivery metadata and lets a consumer decide whether one
//! mutation was authored with knowledge of another.

use crate::FeedKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-feed sequence high-water marks.
///
/// Merging takes the per-feed maximum, so the operation is commutative,
/// associative, and idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    frames: HashMap<FeedKey, u64>,
}

impl Timeframe {
    /// Creates an empty timeframe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded sequence for a feed (0 if not present).
    #[must_use]
    pub fn get(&self, feed: &FeedKey) -> u64 {
        self.frames.get(feed).copied().unwrap_or(0)
    }

    /// Returns the number of feeds with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no feed has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterates over all feed entries.
    pub fn frames(&self) -> impl Iterator<Item = (&FeedKey, &u64)> {
        self.frames.iter()
    }

    /// Records a sequence number for a feed.
    ///
    /// Only moves the mark forward; a lower sequence is ignored.
    pub fn update(&mut self, feed: FeedKey, seq: u64) {
        let entry = self.frames.entry(feed).or_insert(0);
        if seq > *entry {
            *entry = seq;
        }
    }

    /// Merges another timeframe into this one, taking per-feed maxima.
    pub fn merge(&mut self, other: &Self) {
        for (feed, &seq) in &other.frames {
            self.update(*feed, seq);
        }
    }

    /// Returns a new timeframe that is the merge of this and another.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    /// Returns true if every mark in `other` is covered by this timeframe.
    #[must_use]
    pub fn includes(&self, other: &Self) -> bool {
        other.frames.iter().all(|(feed, &seq)| self.get(feed) >= seq)
    }
}

impl FromIterator<(FeedKey, u64)> for Timeframe {
    fn from_iter<I: IntoIterator<Item = (FeedKey, u64)>>(iter: I) -> Self {
        let mut tf = Self::new();
        for (feed, seq) in iter {
            tf.update(feed, seq);
        }
        tf
    }
}
