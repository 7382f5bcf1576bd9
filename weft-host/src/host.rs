//! The data service host.

use crate::{
    EntityInfo, EntitySetDelta, EntityStreamMessage, FeedWriter, HostError, HostResult,
    WriteReceipt,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use weft_graph::{GraphError, ItemManager, Subscription};
use weft_types::{EntityId, FeedMessage};

/// Exposes one local graph to a single remote logical consumer.
///
/// Read-only over the registry; the only mutation path is [`Self::write`],
/// which appends to the outbound log and never touches local state.
pub struct DataServiceHost {
    manager: Arc<ItemManager>,
    writer: Option<Arc<dyn FeedWriter>>,
}

impl DataServiceHost {
    /// Creates a host with a write path into the outbound log.
    #[must_use]
    pub fn new(manager: Arc<ItemManager>, writer: Arc<dyn FeedWriter>) -> Self {
        Self {
            manager,
            writer: Some(writer),
        }
    }

    /// Creates a read-only host: subscriptions work, writes fail.
    #[must_use]
    pub fn read_only(manager: Arc<ItemManager>) -> Self {
        Self {
            manager,
            writer: None,
        }
    }

    /// Returns true if this host has no write capability.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Subscribes to the live entity set.
    ///
    /// The first delta carries the full current id set as `added`;
    /// thereafter each registry change burst yields at most one delta with
    /// newly appeared ids under `added` and vanished ids under `deleted`.
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn subscribe_entity_set(&self) -> EntitySetStream {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut tracked: BTreeSet<EntityId> = self.manager.entity_ids().into_iter().collect();
        let initial = EntitySetDelta {
            added: tracked
                .iter()
                .filter_map(|id| self.entity_info(id))
                .collect(),
            deleted: Vec::new(),
        };
        // The receiver end cannot be closed yet; ignore the impossible error.
        let _ = tx.send(initial);

        let batcher = self.manager.subscribe_coalesced();
        let manager = Arc::clone(&self.manager);
        let task = tokio::spawn(async move {
            loop {
                let _changed = batcher.wait_changed().await;

                let live: BTreeSet<EntityId> = manager.entity_ids().into_iter().collect();
                let delta = EntitySetDelta {
                    added: live
                        .difference(&tracked)
                        .filter_map(|id| manager.get_entity(id).map(|e| EntityInfo::from(&e)))
                        .collect(),
                    deleted: tracked.difference(&live).cloned().collect(),
                };
                tracked = live;

                if delta.is_empty() {
                    continue;
                }
                if tx.send(delta).is_err() {
                    debug!("entity-set subscriber gone, stopping diff task");
                    break;
                }
            }
        });

        EntitySetStream {
            receiver: rx,
            task,
        }
    }

    /// Subscribes to one entity's stream: a full snapshot first, then every
    /// mutation applied to that entity, annotated with delivery metadata.
    ///
    /// Fails with [`HostError::EntityNotFound`] if the id is unknown at
    /// subscribe time.
    pub fn subscribe_entity_stream(&self, id: &EntityId) -> HostResult<EntityStream> {
        let snapshot = self.manager.item_snapshot(id).map_err(|e| match e {
            GraphError::EntityNotFound(id) => HostError::EntityNotFound(id),
            other => HostError::Graph(other),
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(EntityStreamMessage::Snapshot(snapshot));

        let stream_id = id.clone();
        let subscription = self.manager.on_mutation(move |notice| {
            if notice.item_id != stream_id {
                return;
            }
            let _ = tx.send(EntityStreamMessage::Mutation {
                data: notice.mutation.clone(),
                meta: notice.meta.clone(),
            });
        });

        Ok(EntityStream {
            receiver: rx,
            _subscription: subscription,
        })
    }

    fn entity_info(&self, id: &EntityId) -> Option<EntityInfo> {
        self.manager.get_entity(id).map(|e| EntityInfo::from(&e))
    }

    // ── Write path ───────────────────────────────────────────────

    /// Appends a mutation record to the outbound log.
    ///
    /// The local registry is untouched: the record becomes visible locally
    /// only after it round-trips through the log and the demultiplexer.
    pub async fn write(&self, message: &FeedMessage) -> HostResult<WriteReceipt> {
        let writer = self.writer.as_ref().ok_or(HostError::ReadOnly)?;
        writer.append(message).await
    }
}

/// Live entity-set subscription.
pub struct EntitySetStream {
    receiver: mpsc::UnboundedReceiver<EntitySetDelta>,
    task: JoinHandle<()>,
}

impl EntitySetStream {
    /// Receives the next delta; `None` once the subscription ends.
    pub async fn recv(&mut self) -> Option<EntitySetDelta> {
        self.receiver.recv().await
    }
}

impl Drop for EntitySetStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Per-entity subscription: snapshot first, then mutations for that id only.
pub struct EntityStream {
    receiver: mpsc::UnboundedReceiver<EntityStreamMessage>,
    _subscription: Subscription,
}

impl EntityStream {
    /// Receives the next message; `None` once the subscription ends.
    pub async fn recv(&mut self) -> Option<EntityStreamMessage> {
        self.receiver.recv().await
    }

    /// Receives without waiting; `None` when no message is queued.
    pub fn try_recv(&mut self) -> Option<EntityStreamMessage> {
        self.receiver.try_recv().ok()
    }
}
