//! Item manager: the authoritative entity registry.
//!
//! Single source of truth for what entities exist and what model state they
//! carry. All mutation flows through one manager instance; queries and the
//! replication host only read. Construction errors leave the registry
//! untouched, and model-apply errors leave the entity registered with its
//! last-known-good state.
//!
//! Change events are emitted synchronously after each successful mutation,
//! strictly after the registry lock is released, so subscribers observe a
//! self-consistent graph.

use crate::entity::{EntityRecord, ItemRecord, LinkRecord};
use crate::event::{EventEmitter, Subscription, UpdateBatcher};
use crate::{EntityRef, GraphError, GraphResult, ItemRef, LinkRef};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};
use weft_model::{BacklogPolicy, ModelFactory, ModelState};
use weft_types::{EntityId, ItemMutation, ItemSnapshot, MessageMeta};

/// Configuration for an item manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerConfig {
    /// Buffering policy for mutations arriving before model registration.
    pub backlog_policy: BacklogPolicy,
}

/// A successfully applied model mutation, re-broadcast to stream consumers.
#[derive(Debug, Clone)]
pub struct MutationNotice {
    pub item_id: EntityId,
    pub mutation: serde_json::Value,
    pub meta: MessageMeta,
}

#[derive(Default)]
struct Registry {
    entities: HashMap<EntityId, EntityRecord>,
    /// parent item id → child item ids. Derived, kept symmetric with
    /// `parent_id`; never mutated by consumers.
    children: HashMap<EntityId, BTreeSet<EntityId>>,
    /// source item id → link ids.
    links: HashMap<EntityId, BTreeSet<EntityId>>,
    /// target item id → link ids.
    refs: HashMap<EntityId, BTreeSet<EntityId>>,
}

impl Registry {
    fn item(&self, id: &EntityId) -> GraphResult<&ItemRecord> {
        match self.entities.get(id) {
            Some(EntityRecord::Item(item)) => Ok(item),
            Some(EntityRecord::Link(_)) => Err(GraphError::NotAnItem(id.clone())),
            None => Err(GraphError::EntityNotFound(id.clone())),
        }
    }

    fn item_mut(&mut self, id: &EntityId) -> GraphResult<&mut ItemRecord> {
        match self.entities.get_mut(id) {
            Some(EntityRecord::Item(item)) => Ok(item),
            Some(EntityRecord::Link(_)) => Err(GraphError::NotAnItem(id.clone())),
            None => Err(GraphError::EntityNotFound(id.clone())),
        }
    }
}

/// The authoritative entity registry.
pub struct ItemManager {
    factory: Arc<ModelFactory>,
    config: ManagerConfig,
    registry: Mutex<Registry>,
    updated: EventEmitter<EntityId>,
    mutations: EventEmitter<MutationNotice>,
    batchers: Mutex<Vec<Weak<UpdateBatcher>>>,
}

impl ItemManager {
    /// Creates a manager with the default configuration.
    #[must_use]
    pub fn new(factory: Arc<ModelFactory>) -> Self {
        Self::with_config(factory, ManagerConfig::default())
    }

    /// Creates a manager with an explicit configuration.
    #[must_use]
    pub fn with_config(factory: Arc<ModelFactory>, config: ManagerConfig) -> Self {
        Self {
            factory,
            config,
            registry: Mutex::new(Registry::default()),
            updated: EventEmitter::new(),
            mutations: EventEmitter::new(),
            batchers: Mutex::new(Vec::new()),
        }
    }

    /// The model factory this manager attaches models from.
    #[must_use]
    pub fn factory(&self) -> &Arc<ModelFactory> {
        &self.factory
    }

    // ── Construction ─────────────────────────────────────────────

    /// Constructs an item and publishes it to the registry.
    ///
    /// The entity is registered before any initial mutation is applied, so
    /// children resolving against it do not race. If `model_type` is not
    /// yet registered the item starts uninitialized and is invisible to
    /// queries until [`Self::initialize_model`] attaches its model.
    ///
    /// `parent_id` is recorded as given, never validated: feeds from
    /// different writers carry no cross-feed ordering, so a child may
    /// legitimately arrive before its parent's genesis. The reference
    /// resolves through [`Self::parent_of`] once the parent exists.
    pub fn construct_item(
        &self,
        id: impl Into<EntityId>,
        model_type: &str,
        item_type: Option<String>,
        parent_id: Option<EntityId>,
    ) -> GraphResult<ItemRef> {
        let id = id.into();
        let item_ref = {
            let mut registry = self.lock_registry();
            if registry.entities.contains_key(&id) {
                return Err(GraphError::DuplicateId(id));
            }

            let state = self.initial_state(model_type, &id);
            let record = ItemRecord {
                id: id.clone(),
                item_type,
                parent_id: parent_id.clone(),
                deleted: false,
                state,
            };
            let item_ref = record.to_ref();
            registry.entities.insert(id.clone(), EntityRecord::Item(record));
            if let Some(parent) = parent_id {
                registry.children.entry(parent).or_default().insert(id.clone());
            }
            item_ref
        };
        debug!(id = %id, model_type, "constructed item");
        self.notify_updated(&id);
        Ok(item_ref)
    }

    /// Constructs a link between two existing items.
    ///
    /// Both endpoints must resolve to items already in the registry; a
    /// dangling reference is a hard construction error and leaves the
    /// registry unchanged.
    pub fn construct_link(
        &self,
        id: impl Into<EntityId>,
        model_type: &str,
        item_type: Option<String>,
        source_id: impl Into<EntityId>,
        target_id: impl Into<EntityId>,
    ) -> GraphResult<LinkRef> {
        let id = id.into();
        let source_id = source_id.into();
        let target_id = target_id.into();
        let link_ref = {
            let mut registry = self.lock_registry();
            if registry.entities.contains_key(&id) {
                return Err(GraphError::DuplicateId(id));
            }
            for endpoint in [&source_id, &target_id] {
                match registry.entities.get(endpoint) {
                    Some(EntityRecord::Item(_)) => {}
                    _ => {
                        return Err(GraphError::DanglingReference {
                            link: id,
                            missing: endpoint.clone(),
                        })
                    }
                }
            }

            let state = self.initial_state(model_type, &id);
            let record = LinkRecord {
                id: id.clone(),
                item_type,
                source_id: source_id.clone(),
                target_id: target_id.clone(),
                state,
            };
            let link_ref = record.to_ref();
            registry.entities.insert(id.clone(), EntityRecord::Link(record));
            registry.links.entry(source_id).or_default().insert(id.clone());
            registry.refs.entry(target_id).or_default().insert(id.clone());
            link_ref
        };
        debug!(id = %id, model_type, "constructed link");
        self.notify_updated(&id);
        Ok(link_ref)
    }

    fn initial_state(&self, model_type: &str, id: &EntityId) -> ModelState {
        match self.factory.create_model(model_type, id) {
            Ok(model) => ModelState::Attached(model),
            Err(_) => {
                debug!(id = %id, model_type, "model type not registered, deferring attachment");
                ModelState::uninitialized(model_type, self.config.backlog_policy)
            }
        }
    }

    // ── Model attachment ─────────────────────────────────────────

    /// Attaches the entity's model now that its type is registered, then
    /// replays the pre-registration backlog in original arrival order.
    ///
    /// Attaching to an entity whose model is already present is a no-op;
    /// the existing model is never silently replaced.
    pub fn initialize_model(&self, id: &EntityId) -> GraphResult<()> {
        let replayed = {
            let mut registry = self.lock_registry();
            let record = registry
                .entities
                .get_mut(id)
                .ok_or_else(|| GraphError::EntityNotFound(id.clone()))?;

            let state = record.state_mut();
            let previous = std::mem::replace(
                state,
                ModelState::uninitialized("", self.config.backlog_policy),
            );
            match previous {
                ModelState::Attached(model) => {
                    debug!(id = %id, "model already attached, ignoring re-initialization");
                    *state = ModelState::Attached(model);
                    return Ok(());
                }
                ModelState::Uninitialized {
                    model_type,
                    mut backlog,
                    pending_snapshot,
                } => {
                    let mut model = match self.factory.create_model(&model_type, id) {
                        Ok(model) => model,
                        Err(e) => {
                            // Attachment failed; put the buffered state back.
                            *state = ModelState::Uninitialized {
                                model_type,
                                backlog,
                                pending_snapshot,
                            };
                            return Err(e.into());
                        }
                    };

                    if let Some(snapshot) = &pending_snapshot {
                        if let Err(e) = model.restore(snapshot) {
                            warn!(id = %id, error = %e, "pending snapshot rejected by model");
                        }
                    }

                    let mut replayed = Vec::new();
                    for (mutation, meta) in backlog.drain() {
                        match model.apply(&mutation, &meta) {
                            Ok(()) => replayed.push(MutationNotice {
                                item_id: id.clone(),
                                mutation,
                                meta,
                            }),
                            Err(e) => {
                                warn!(id = %id, error = %e, "backlogged mutation rejected on replay");
                            }
                        }
                    }
                    *state = ModelState::Attached(model);
                    replayed
                }
            }
        };

        debug!(id = %id, replayed = replayed.len(), "model attached");
        self.notify_updated(id);
        for notice in replayed {
            self.mutations.emit(&notice);
        }
        Ok(())
    }

    /// Attaches models to every uninitialized entity whose model type is
    /// now registered. Wired to the factory's `registered` event by the
    /// demultiplexer.
    pub fn initialize_pending(&self, model_type: &str) {
        let pending: Vec<EntityId> = {
            let registry = self.lock_registry();
            registry
                .entities
                .values()
                .filter(|record| {
                    !record.state().is_attached() && record.state().model_type() == model_type
                })
                .map(|record| record.id().clone())
                .collect()
        };
        for id in pending {
            if let Err(e) = self.initialize_model(&id) {
                warn!(id = %id, model_type, error = %e, "deferred model attachment failed");
            }
        }
    }

    // ── Mutation routing ─────────────────────────────────────────

    /// Routes one model mutation to the entity's model.
    ///
    /// If the model is not yet attached the mutation is buffered (per the
    /// configured backlog policy) and retried on attachment. Model apply
    /// errors are surfaced to the caller; the entity stays registered with
    /// its last-known-good state.
    pub fn process_model_message(
        &self,
        id: &EntityId,
        mutation: &serde_json::Value,
        meta: &MessageMeta,
    ) -> GraphResult<()> {
        {
            let mut registry = self.lock_registry();
            let record = registry
                .entities
                .get_mut(id)
                .ok_or_else(|| GraphError::EntityNotFound(id.clone()))?;

            match record.state_mut() {
                ModelState::Uninitialized { backlog, .. } => {
                    warn!(id = %id, "mutation for uninitialized entity, buffering until model registers");
                    backlog.push(mutation.clone(), meta.clone());
                    return Ok(());
                }
                ModelState::Attached(model) => {
                    model.apply(mutation, meta)?;
                }
            }
        }
        self.notify_updated(id);
        self.mutations.emit(&MutationNotice {
            item_id: id.clone(),
            mutation: mutation.clone(),
            meta: meta.clone(),
        });
        Ok(())
    }

    /// Resets the entity's model wholesale from a snapshot, bypassing
    /// incremental apply. If the model is not yet attached the snapshot is
    /// held and restored on attachment, superseding any backlog buffered
    /// before it.
    pub fn reset_to_snapshot(&self, id: &EntityId, snapshot: &serde_json::Value) -> GraphResult<()> {
        {
            let mut registry = self.lock_registry();
            let record = registry
                .entities
                .get_mut(id)
                .ok_or_else(|| GraphError::EntityNotFound(id.clone()))?;

            match record.state_mut() {
                ModelState::Uninitialized {
                    backlog,
                    pending_snapshot,
                    ..
                } => {
                    backlog.drain().for_each(drop);
                    *pending_snapshot = Some(snapshot.clone());
                }
                ModelState::Attached(model) => {
                    model.restore(snapshot)?;
                }
            }
        }
        self.notify_updated(id);
        Ok(())
    }

    /// Applies an item-level mutation: parent reassignment and/or the
    /// soft-delete flag.
    ///
    /// A new `parent_id` is recorded without checking that the parent has
    /// arrived yet; resolution is lazy, as with construction.
    pub fn apply_item_mutation(&self, id: &EntityId, mutation: &ItemMutation) -> GraphResult<()> {
        {
            let mut registry = self.lock_registry();
            let previous_parent = registry.item(id)?.parent_id.clone();

            let item = registry.item_mut(id)?;
            if let Some(deleted) = mutation.deleted {
                item.deleted = deleted;
            }
            if let Some(parent) = &mutation.parent_id {
                item.parent_id = Some(parent.clone());
                if let Some(old) = previous_parent {
                    if let Some(siblings) = registry.children.get_mut(&old) {
                        siblings.remove(id);
                    }
                }
                registry
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .insert(id.clone());
            }
        }
        self.notify_updated(id);
        Ok(())
    }

    /// Reassigns an item's parent.
    pub fn set_parent(&self, id: &EntityId, parent_id: EntityId) -> GraphResult<()> {
        self.apply_item_mutation(
            id,
            &ItemMutation {
                parent_id: Some(parent_id),
                deleted: None,
            },
        )
    }

    /// Sets or clears an item's soft-delete flag.
    pub fn set_deleted(&self, id: &EntityId, deleted: bool) -> GraphResult<()> {
        self.apply_item_mutation(
            id,
            &ItemMutation {
                parent_id: None,
                deleted: Some(deleted),
            },
        )
    }

    // ── Read access ──────────────────────────────────────────────

    /// Returns an item view, or `None` if the id is absent or a link.
    #[must_use]
    pub fn get_item(&self, id: &EntityId) -> Option<ItemRef> {
        let registry = self.lock_registry();
        match registry.entities.get(id) {
            Some(EntityRecord::Item(item)) => Some(item.to_ref()),
            _ => None,
        }
    }

    /// Returns a link view, or `None` if the id is absent or an item.
    #[must_use]
    pub fn get_link(&self, id: &EntityId) -> Option<LinkRef> {
        let registry = self.lock_registry();
        match registry.entities.get(id) {
            Some(EntityRecord::Link(link)) => Some(link.to_ref()),
            _ => None,
        }
    }

    /// Returns a view of either entity kind.
    #[must_use]
    pub fn get_entity(&self, id: &EntityId) -> Option<EntityRef> {
        let registry = self.lock_registry();
        registry.entities.get(id).map(|record| match record {
            EntityRecord::Item(item) => EntityRef::Item(item.to_ref()),
            EntityRecord::Link(link) => EntityRef::Link(link.to_ref()),
        })
    }

    /// Returns true if an entity with this id exists.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.lock_registry().entities.contains_key(id)
    }

    /// Returns views of all items, in id order.
    #[must_use]
    pub fn items(&self) -> Vec<ItemRef> {
        let registry = self.lock_registry();
        let mut items: Vec<ItemRef> = registry
            .entities
            .values()
            .filter_map(|record| match record {
                EntityRecord::Item(item) => Some(item.to_ref()),
                EntityRecord::Link(_) => None,
            })
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    /// Returns all entity ids, in id order.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let registry = self.lock_registry();
        let mut ids: Vec<EntityId> = registry.entities.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of entities in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_registry().entities.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_registry().entities.is_empty()
    }

    /// Returns an item's parent, or `None` for roots and unknown ids.
    #[must_use]
    pub fn parent_of(&self, id: &EntityId) -> Option<ItemRef> {
        let registry = self.lock_registry();
        let parent_id = registry.item(id).ok()?.parent_id.clone()?;
        match registry.entities.get(&parent_id) {
            Some(EntityRecord::Item(item)) => Some(item.to_ref()),
            _ => None,
        }
    }

    /// Resolves a link's source item.
    pub fn source_of(&self, link_id: &EntityId) -> GraphResult<ItemRef> {
        self.link_endpoint(link_id, /* target: */ false)
    }

    /// Resolves a link's target item.
    pub fn target_of(&self, link_id: &EntityId) -> GraphResult<ItemRef> {
        self.link_endpoint(link_id, /* target: */ true)
    }

    fn link_endpoint(&self, link_id: &EntityId, target: bool) -> GraphResult<ItemRef> {
        let registry = self.lock_registry();
        let link = match registry.entities.get(link_id) {
            Some(EntityRecord::Link(link)) => link,
            Some(EntityRecord::Item(_)) => return Err(GraphError::NotALink(link_id.clone())),
            None => return Err(GraphError::EntityNotFound(link_id.clone())),
        };
        let endpoint = if target { &link.target_id } else { &link.source_id };
        registry.item(endpoint).map(ItemRecord::to_ref)
    }

    /// Returns views of an item's children, in id order.
    #[must_use]
    pub fn children_of(&self, id: &EntityId) -> Vec<ItemRef> {
        let registry = self.lock_registry();
        registry
            .children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| match registry.entities.get(child) {
                Some(EntityRecord::Item(item)) => Some(item.to_ref()),
                _ => None,
            })
            .collect()
    }

    /// Returns views of the links where the item is the source, in id order.
    #[must_use]
    pub fn links_of(&self, id: &EntityId) -> Vec<LinkRef> {
        self.link_set(id, /* refs: */ false)
    }

    /// Returns views of the links where the item is the target, in id order.
    #[must_use]
    pub fn refs_of(&self, id: &EntityId) -> Vec<LinkRef> {
        self.link_set(id, /* refs: */ true)
    }

    fn link_set(&self, id: &EntityId, refs: bool) -> Vec<LinkRef> {
        let registry = self.lock_registry();
        let index = if refs { &registry.refs } else { &registry.links };
        index
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|link_id| match registry.entities.get(link_id) {
                Some(EntityRecord::Link(link)) => Some(link.to_ref()),
                _ => None,
            })
            .collect()
    }

    /// Returns the entity's model snapshot: the attached model's current
    /// state, or the held pending snapshot while uninitialized.
    pub fn model_snapshot(&self, id: &EntityId) -> GraphResult<Option<serde_json::Value>> {
        let registry = self.lock_registry();
        let record = registry
            .entities
            .get(id)
            .ok_or_else(|| GraphError::EntityNotFound(id.clone()))?;
        Ok(match record.state() {
            ModelState::Attached(model) => Some(model.snapshot()),
            ModelState::Uninitialized {
                pending_snapshot, ..
            } => pending_snapshot.clone(),
        })
    }

    /// Builds the per-entity snapshot record used by whole-graph export and
    /// the replication boundary.
    pub fn item_snapshot(&self, id: &EntityId) -> GraphResult<ItemSnapshot> {
        let registry = self.lock_registry();
        let record = registry
            .entities
            .get(id)
            .ok_or_else(|| GraphError::EntityNotFound(id.clone()))?;
        let model = match record.state() {
            ModelState::Attached(model) => Some(model.snapshot()),
            ModelState::Uninitialized {
                pending_snapshot, ..
            } => pending_snapshot.clone(),
        };
        Ok(match record {
            EntityRecord::Item(item) => ItemSnapshot {
                item_id: item.id.clone(),
                item_type: item.item_type.clone(),
                model_type: item.state.model_type().to_string(),
                parent_id: item.parent_id.clone(),
                link: None,
                deleted: item.deleted,
                model,
            },
            EntityRecord::Link(link) => ItemSnapshot {
                item_id: link.id.clone(),
                item_type: link.item_type.clone(),
                model_type: link.state.model_type().to_string(),
                parent_id: None,
                link: Some(weft_types::LinkData {
                    source: link.source_id.clone(),
                    target: link.target_id.clone(),
                }),
                deleted: false,
                model,
            },
        })
    }

    // ── Events ───────────────────────────────────────────────────

    /// Subscribes to the per-entity `updated` event, fired synchronously
    /// after each successful mutation application.
    #[must_use]
    pub fn on_updated(&self, callback: impl Fn(&EntityId) + Send + Sync + 'static) -> Subscription {
        self.updated.subscribe(callback)
    }

    /// Subscribes to the mutation broadcast: every successfully applied
    /// model mutation with its delivery metadata.
    #[must_use]
    pub fn on_mutation(
        &self,
        callback: impl Fn(&MutationNotice) + Send + Sync + 'static,
    ) -> Subscription {
        self.mutations.subscribe(callback)
    }

    /// Returns a coalescing batcher that collects update bursts into single
    /// wakeups, for batched consumers. A burst of changes within one turn
    /// yields one notification carrying the union of changed ids.
    #[must_use]
    pub fn subscribe_coalesced(&self) -> Arc<UpdateBatcher> {
        let batcher = Arc::new(UpdateBatcher::new());
        self.batchers
            .lock()
            .expect("batcher list poisoned")
            .push(Arc::downgrade(&batcher));
        batcher
    }

    fn notify_updated(&self, id: &EntityId) {
        self.updated.emit(id);
        let mut batchers = self.batchers.lock().expect("batcher list poisoned");
        batchers.retain(|weak| match weak.upgrade() {
            Some(batcher) => {
                batcher.mark(id.clone());
                true
            }
            None => false,
        });
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().expect("registry lock poisoned")
    }
}
