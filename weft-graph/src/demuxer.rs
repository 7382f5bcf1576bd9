//! Item demultiplexer: inbound record stream → registry calls.
//!
//! Consumes the ordered inbound mutation stream, classifies each record
//! (genesis / item-mutation / model-mutation / snapshot) and drives the
//! item manager accordingly. Also produces and consumes whole-graph
//! snapshots, restoring entities in parent-before-child order.

use crate::{GraphError, GraphResult, ItemManager};
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use weft_types::{DatabaseSnapshot, EntityId, FeedMessage, ItemSnapshot, MessageMeta};

/// Translates the ordered inbound record stream into item-manager calls.
pub struct ItemDemuxer {
    manager: Arc<ItemManager>,
}

impl ItemDemuxer {
    /// Creates a demultiplexer over a manager and wires the manager's
    /// factory `registered` event so that entities constructed before their
    /// model type was available get their models attached when it arrives.
    #[must_use]
    pub fn new(manager: Arc<ItemManager>) -> Self {
        let weak: Weak<ItemManager> = Arc::downgrade(&manager);
        manager.factory().on_registered(move |model_type| {
            if let Some(manager) = weak.upgrade() {
                manager.initialize_pending(model_type);
            }
        });
        Self { manager }
    }

    /// The manager this demultiplexer drives.
    #[must_use]
    pub fn manager(&self) -> &Arc<ItemManager> {
        &self.manager
    }

    // ── Inbound stream ───────────────────────────────────────────

    /// Processes one inbound mutation record.
    ///
    /// Protocol violations (mutations for entities that were never
    /// constructed, id mismatches) are returned as errors; model apply and
    /// restore failures are logged and do not halt the stream, so one
    /// corrupt entity cannot take down the whole graph.
    pub fn handle_message(&self, message: &FeedMessage, meta: &MessageMeta) -> GraphResult<()> {
        if let Some(genesis) = &message.genesis {
            let constructed = match &genesis.link {
                Some(link) => {
                    self.manager
                        .construct_link(
                            message.item_id.clone(),
                            &genesis.model_type,
                            genesis.item_type.clone(),
                            link.source.clone(),
                            link.target.clone(),
                        )?
                        .id
                }
                None => {
                    self.manager
                        .construct_item(
                            message.item_id.clone(),
                            &genesis.model_type,
                            genesis.item_type.clone(),
                            None,
                        )?
                        .id
                }
            };
            // Defensive: the registry must hand back the id we asked for.
            if constructed != message.item_id {
                return Err(GraphError::IdMismatch {
                    expected: message.item_id.clone(),
                    actual: constructed,
                });
            }

            // Inline first mutation, applied after the entity is published.
            if let Some(mutation) = &message.mutation {
                self.apply_model_mutation(&message.item_id, mutation, meta);
            }
            return Ok(());
        }

        if let Some(item_mutation) = &message.item_mutation {
            return self
                .manager
                .apply_item_mutation(&message.item_id, item_mutation)
                .map_err(|e| match e {
                    GraphError::EntityNotFound(id) => GraphError::ProtocolViolation(format!(
                        "item mutation for unknown entity {id}"
                    )),
                    other => other,
                });
        }

        if let Some(snapshot) = &message.snapshot {
            if !self.manager.contains(&message.item_id) {
                return Err(GraphError::ProtocolViolation(format!(
                    "snapshot for unknown entity {}",
                    message.item_id
                )));
            }
            // Restore errors are contained like apply errors: one corrupt
            // entity must not halt the stream.
            if let Err(e) = self.manager.reset_to_snapshot(&message.item_id, snapshot) {
                warn!(id = %message.item_id, error = %e, "model rejected snapshot, keeping last-known-good state");
            }
            return Ok(());
        }

        if let Some(mutation) = &message.mutation {
            if !self.manager.contains(&message.item_id) {
                return Err(GraphError::ProtocolViolation(format!(
                    "model mutation for unknown entity {}",
                    message.item_id
                )));
            }
            self.apply_model_mutation(&message.item_id, mutation, meta);
            return Ok(());
        }

        debug!(id = %message.item_id, "record carries no operation, skipping");
        Ok(())
    }

    /// Model-apply errors are contained per entity: log and continue.
    fn apply_model_mutation(
        &self,
        id: &EntityId,
        mutation: &serde_json::Value,
        meta: &MessageMeta,
    ) {
        if let Err(e) = self.manager.process_model_message(id, mutation, meta) {
            warn!(id = %id, error = %e, "model rejected mutation, keeping last-known-good state");
        }
    }

    // ── Whole-graph snapshots ────────────────────────────────────

    /// Exports one per-entity snapshot record for every live entity.
    pub fn export_snapshot(&self) -> GraphResult<DatabaseSnapshot> {
        let mut items = Vec::new();
        for id in self.manager.entity_ids() {
            items.push(self.manager.item_snapshot(&id)?);
        }
        Ok(DatabaseSnapshot { items })
    }

    /// Restores a whole-graph snapshot into the manager.
    ///
    /// Entities are constructed in an order where no entity precedes its
    /// parent and no link precedes its endpoints. Restore is all-or-nothing:
    /// on any error the manager must be considered partially filled and
    /// discarded — restore into a fresh manager.
    pub fn restore_snapshot(&self, snapshot: &DatabaseSnapshot) -> GraphResult<()> {
        for record in topological_order(&snapshot.items)? {
            self.restore_entity(record)?;
        }
        Ok(())
    }

    fn restore_entity(&self, record: &ItemSnapshot) -> GraphResult<()> {
        match &record.link {
            Some(link) => {
                self.manager.construct_link(
                    record.item_id.clone(),
                    &record.model_type,
                    record.item_type.clone(),
                    link.source.clone(),
                    link.target.clone(),
                )?;
            }
            None => {
                self.manager.construct_item(
                    record.item_id.clone(),
                    &record.model_type,
                    record.item_type.clone(),
                    record.parent_id.clone(),
                )?;
                if record.deleted {
                    self.manager.set_deleted(&record.item_id, true)?;
                }
            }
        }
        if let Some(model) = &record.model {
            self.manager.reset_to_snapshot(&record.item_id, model)?;
        }
        Ok(())
    }
}

/// Orders snapshot records so that every item follows its parent and every
/// link follows both endpoints.
///
/// Repeatedly scans the remaining records, emitting each whose dependencies
/// are satisfied; a full pass that emits nothing while records remain means
/// a missing parent or a cycle. O(n²) worst case, stable; correctness
/// matters more than asymptotics at typical graph sizes.
fn topological_order(items: &[ItemSnapshot]) -> GraphResult<Vec<&ItemSnapshot>> {
    let mut emitted: HashSet<&EntityId> = HashSet::new();
    let mut remaining: Vec<&ItemSnapshot> = items.iter().collect();
    let mut ordered = Vec::with_capacity(items.len());

    while !remaining.is_empty() {
        let mut deferred = Vec::new();
        let mut progressed = false;

        for record in remaining {
            let ready = match &record.link {
                Some(link) => emitted.contains(&link.source) && emitted.contains(&link.target),
                None => record
                    .parent_id
                    .as_ref()
                    .map_or(true, |parent| emitted.contains(parent)),
            };
            if ready {
                emitted.insert(&record.item_id);
                ordered.push(record);
                progressed = true;
            } else {
                deferred.push(record);
            }
        }

        if !progressed {
            let stuck = deferred.iter().map(|r| r.item_id.clone()).collect();
            return Err(GraphError::TopologicalSort(stuck));
        }
        remaining = deferred;
    }
    Ok(ordered)
}
