//! Feed message wire records.
//!
//! A feed message is one mutation record on the ordered inbound stream.
//! Its optional fields are mutually exclusive by the wire contract:
//! a genesis record constructs an entity, an item mutation reassigns a
//! parent or toggles soft-deletion, a model mutation is routed to the
//! entity's model, and a snapshot resets the model wholesale.
//!
//! The core has no knowledge of what the opaque `mutation` and `snapshot`
//! payloads contain — that is entirely model-defined.

use crate::{EntityId, FeedKey, MemberKey, Timeframe};
use serde::{Deserialize, Serialize};

/// Out-of-band delivery metadata for one inbound record.
///
/// Supplied by the feed transport, not by the author of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMeta {
    /// The writer feed this record arrived on.
    pub feed_key: FeedKey,
    /// The party member that authored the record.
    pub member_key: MemberKey,
    /// Position of the record within its feed.
    pub seq: u64,
    /// Logical timestamp: feed high-water marks at authoring time.
    #[serde(default)]
    pub timeframe: Timeframe,
}

impl MessageMeta {
    /// Creates delivery metadata with an empty timeframe.
    #[must_use]
    pub fn new(feed_key: FeedKey, member_key: MemberKey, seq: u64) -> Self {
        Self {
            feed_key,
            member_key,
            seq,
            timeframe: Timeframe::new(),
        }
    }

    /// Sets the timeframe.
    #[must_use]
    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }
}

/// Link endpoint ids carried in a genesis record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    /// The item the link points from.
    pub source: EntityId,
    /// The item the link points to.
    pub target: EntityId,
}

/// The first mutation record for an entity, carrying its type metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genesis {
    /// Application-defined type tag (e.g. `Org`, `Project`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// The model implementation governing the entity's state.
    pub model_type: String,
    /// Present when the entity is a link rather than an item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkData>,
}

/// Item-level mutation: parent reassignment and soft-deletion.
///
/// Distinct from model mutations — this is graph bookkeeping, not field
/// data, and is applied by the registry rather than the entity's model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMutation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

/// One mutation record on the inbound stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    /// The entity this record applies to.
    pub item_id: EntityId,

    /// Entity construction metadata; present only on the first record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis: Option<Genesis>,

    /// Graph-level mutation (parent, soft-delete).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_mutation: Option<ItemMutation>,

    /// Opaque model-specific mutation payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<serde_json::Value>,

    /// Opaque model-specific full-state snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
}

impl FeedMessage {
    /// Creates a genesis record for an item.
    #[must_use]
    pub fn genesis_item(
        item_id: impl Into<EntityId>,
        model_type: impl Into<String>,
        item_type: Option<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            genesis: Some(Genesis {
                item_type,
                model_type: model_type.into(),
                link: None,
            }),
            item_mutation: None,
            mutation: None,
            snapshot: None,
        }
    }

    /// Creates a genesis record for a link between two items.
    #[must_use]
    pub fn genesis_link(
        item_id: impl Into<EntityId>,
        model_type: impl Into<String>,
        item_type: Option<String>,
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            genesis: Some(Genesis {
                item_type,
                model_type: model_type.into(),
                link: Some(LinkData {
                    source: source.into(),
                    target: target.into(),
                }),
            }),
            item_mutation: None,
            mutation: None,
            snapshot: None,
        }
    }

    /// Creates a model-mutation record.
    #[must_use]
    pub fn model_mutation(item_id: impl Into<EntityId>, mutation: serde_json::Value) -> Self {
        Self {
            item_id: item_id.into(),
            genesis: None,
            item_mutation: None,
            mutation: Some(mutation),
            snapshot: None,
        }
    }

    /// Creates an item-mutation record (parent reassignment / soft-delete).
    #[must_use]
    pub fn item_mutation(item_id: impl Into<EntityId>, mutation: ItemMutation) -> Self {
        Self {
            item_id: item_id.into(),
            genesis: None,
            item_mutation: Some(mutation),
            mutation: None,
            snapshot: None,
        }
    }

    /// Creates a model-snapshot record.
    #[must_use]
    pub fn model_snapshot(item_id: impl Into<EntityId>, snapshot: serde_json::Value) -> Self {
        Self {
            item_id: item_id.into(),
            genesis: None,
            item_mutation: None,
            mutation: None,
            snapshot: Some(snapshot),
        }
    }

    /// Attaches an inline first mutation to a genesis record.
    #[must_use]
    pub fn with_mutation(mut self, mutation: serde_json::Value) -> Self {
        self.mutation = Some(mutation);
        self
    }
}
