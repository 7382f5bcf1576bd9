//! Whole-graph snapshot export/import records.

use crate::{EntityId, LinkData};
use serde::{Deserialize, Serialize};

/// Per-entity snapshot record.
///
/// Carries enough genesis-equivalent metadata to reconstruct the entity
/// plus the opaque full state of its model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub item_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    pub model_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    /// Present when the entity is a link; restore validates the endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkData>,
    /// Soft-delete flag, preserved across restore.
    #[serde(default)]
    pub deleted: bool,
    /// Opaque model snapshot, absent while the model is uninitialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<serde_json::Value>,
}

/// Snapshot of an entire graph: one record per live entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub items: Vec<ItemSnapshot>,
}

impl DatabaseSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entity records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the snapshot contains no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
