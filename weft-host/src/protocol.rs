//! Replication boundary stream contracts.

use serde::{Deserialize, Serialize};
use weft_graph::{EntityRef, ItemRef, LinkRef};
use weft_types::{EntityId, FeedKey, ItemSnapshot, LinkData, MessageMeta};

/// Genesis-equivalent metadata for one entity, carried in entity-set
/// deltas so the remote side can reconstruct the entity locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub item_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    pub model_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkData>,
}

impl From<&ItemRef> for EntityInfo {
    fn from(item: &ItemRef) -> Self {
        Self {
            item_id: item.id.clone(),
            item_type: item.item_type.clone(),
            model_type: item.model_type.clone(),
            parent_id: item.parent_id.clone(),
            link: None,
        }
    }
}

impl From<&LinkRef> for EntityInfo {
    fn from(link: &LinkRef) -> Self {
        Self {
            item_id: link.id.clone(),
            item_type: link.item_type.clone(),
            model_type: link.model_type.clone(),
            parent_id: None,
            link: Some(LinkData {
                source: link.source_id.clone(),
                target: link.target_id.clone(),
            }),
        }
    }
}

impl From<&EntityRef> for EntityInfo {
    fn from(entity: &EntityRef) -> Self {
        match entity {
            EntityRef::Item(item) => Self::from(item),
            EntityRef::Link(link) => Self::from(link),
        }
    }
}

/// One entity-set notification: ids that appeared and ids that vanished
/// since the previous delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySetDelta {
    pub added: Vec<EntityInfo>,
    pub deleted: Vec<EntityId>,
}

impl EntitySetDelta {
    /// Returns true if the delta carries no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

/// One message on a per-entity stream: a full snapshot first, then
/// individual mutations for that entity only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityStreamMessage {
    Snapshot(ItemSnapshot),
    Mutation {
        data: serde_json::Value,
        meta: MessageMeta,
    },
}

/// Receipt for a durably sequenced outbound write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    /// The feed the record was appended to.
    pub feed_key: FeedKey,
    /// The record's position within that feed.
    pub seq: u64,
}
