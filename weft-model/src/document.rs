//! Last-writer-wins document model.
//!
//! A flat field map with per-field LWW semantics: each field carries the
//! hybrid timestamp at which it was last set, ties broken by author key so
//! concurrent writes resolve identically on every replica.

use crate::{Model, ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use weft_types::{HybridTimestamp, MemberKey, MessageMeta};

/// Model type identifier for [`DocumentModel`].
pub const DOCUMENT_MODEL_TYPE: &str = "weft.document";

/// One field with its write provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FieldEntry {
    value: serde_json::Value,
    timestamp: HybridTimestamp,
    author: MemberKey,
}

/// Wire format of a document mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentMutation {
    /// Fields to set, each at the mutation's timestamp.
    set: BTreeMap<String, serde_json::Value>,
    /// Authoring timestamp used for LWW ordering.
    timestamp: HybridTimestamp,
}

/// A flat JSON document with per-field last-writer-wins merge.
///
/// Carries a hybrid logical clock advanced past every mutation timestamp
/// the document observes, so locally-authored writes (via
/// [`Self::author_set`]) always order after remote state already merged in.
#[derive(Default)]
pub struct DocumentModel {
    fields: BTreeMap<String, FieldEntry>,
    clock: HybridTimestamp,
}

impl DocumentModel {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mutation payload setting the given fields at the current
    /// wall-clock time.
    #[must_use]
    pub fn set_mutation(fields: BTreeMap<String, serde_json::Value>) -> serde_json::Value {
        Self::set_mutation_at(fields, HybridTimestamp::now())
    }

    /// Builds a locally-authored mutation, advancing the document's clock
    /// so the stamp is strictly greater than every timestamp observed so
    /// far. The returned payload still has to round-trip through the feed
    /// before it lands in this document's fields.
    #[must_use]
    pub fn author_set(&mut self, fields: BTreeMap<String, serde_json::Value>) -> serde_json::Value {
        self.clock = self.clock.tick();
        Self::set_mutation_at(fields, self.clock)
    }

    /// Builds a mutation payload setting the given fields at an explicit
    /// timestamp.
    #[must_use]
    pub fn set_mutation_at(
        fields: BTreeMap<String, serde_json::Value>,
        timestamp: HybridTimestamp,
    ) -> serde_json::Value {
        serde_json::to_value(DocumentMutation {
            set: fields,
            timestamp,
        })
        .unwrap_or(serde_json::Value::Null)
    }

    /// Returns a field's current value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field).map(|e| &e.value)
    }

    /// Returns the number of fields present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn invalid_mutation(reason: impl Into<String>) -> ModelError {
        ModelError::InvalidMutation {
            model_type: DOCUMENT_MODEL_TYPE.to_string(),
            reason: reason.into(),
        }
    }
}

impl Model for DocumentModel {
    fn type_name(&self) -> &str {
        DOCUMENT_MODEL_TYPE
    }

    fn apply(&mut self, mutation: &serde_json::Value, meta: &MessageMeta) -> ModelResult<()> {
        let mutation: DocumentMutation = serde_json::from_value(mutation.clone())
            .map_err(|e| Self::invalid_mutation(e.to_string()))?;

        for (field, value) in mutation.set {
            let incoming = FieldEntry {
                value,
                timestamp: mutation.timestamp,
                author: meta.member_key,
            };
            match self.fields.get(&field) {
                Some(existing)
                    if (existing.timestamp, existing.author.as_uuid())
                        >= (incoming.timestamp, incoming.author.as_uuid()) =>
                {
                    // Existing write wins; drop the stale set.
                }
                _ => {
                    self.fields.insert(field, incoming);
                }
            }
        }
        self.clock = self.clock.receive(&mutation.timestamp);
        Ok(())
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.fields).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, snapshot: &serde_json::Value) -> ModelResult<()> {
        self.fields = serde_json::from_value(snapshot.clone()).map_err(|e| {
            ModelError::InvalidSnapshot {
                model_type: DOCUMENT_MODEL_TYPE.to_string(),
                reason: e.to_string(),
            }
        })?;
        // The clock is derived state: resume past the newest restored write.
        self.clock = self
            .fields
            .values()
            .map(|e| e.timestamp)
            .max()
            .unwrap_or_default();
        Ok(())
    }
}
