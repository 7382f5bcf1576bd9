//! Core type definitions for Weft.
//!
//! This crate defines the fundamental, model-agnostic types used throughout
//! the graph engine:
//! - Entity, feed, and member identifiers
//! - Hybrid Logical Clock timestamps and per-feed timeframes
//! - The feed message wire record and its delivery metadata
//! - Snapshot export/import records
//!
//! Model-specific state (document fields, CRDT internals, etc.) belongs to
//! the model implementations, not here.

mod feed;
mod ids;
mod snapshot;
mod timeframe;
mod timestamp;

pub use feed::{FeedMessage, Genesis, ItemMutation, LinkData, MessageMeta};
pub use ids::{EntityId, FeedKey, MemberKey};
pub use snapshot::{DatabaseSnapshot, ItemSnapshot};
pub use timeframe::Timeframe;
pub use timestamp::HybridTimestamp;
