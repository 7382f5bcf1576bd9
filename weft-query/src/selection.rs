//! Selections: lazy traversal pipelines and their materialized results.

use crate::{ItemFilter, LinkFilter, QueryOptions, ShowDeleted};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tracing::trace;
use weft_graph::{EntityRef, ItemManager, ItemRef, LinkRef, Subscription};
use weft_types::EntityId;

type Visitor = Arc<dyn Fn(&[EntityRef]) + Send + Sync>;

/// One traversal step in a selection pipeline.
#[derive(Clone)]
enum Step {
    Filter(ItemFilter),
    Parent,
    Children,
    Links(LinkFilter),
    Refs(LinkFilter),
    Target,
    Source,
    Call(Visitor),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(filter) => f.debug_tuple("Filter").field(filter).finish(),
            Self::Parent => write!(f, "Parent"),
            Self::Children => write!(f, "Children"),
            Self::Links(filter) => f.debug_tuple("Links").field(filter).finish(),
            Self::Refs(filter) => f.debug_tuple("Refs").field(filter).finish(),
            Self::Target => write!(f, "Target"),
            Self::Source => write!(f, "Source"),
            Self::Call(_) => write!(f, "Call"),
        }
    }
}

/// Where a selection starts: the whole entity set or a single item.
///
/// The root is a stable identity for the selection, usable as a memoization
/// key by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRoot {
    Database,
    Item(EntityId),
}

/// Selects over every item in the manager's registry.
#[must_use]
pub fn select(manager: &Arc<ItemManager>) -> Selection {
    Selection {
        manager: Arc::clone(manager),
        root: SelectionRoot::Database,
        steps: Vec::new(),
    }
}

/// Selects a single item by id as the traversal root.
#[must_use]
pub fn select_item(manager: &Arc<ItemManager>, id: impl Into<EntityId>) -> Selection {
    Selection {
        manager: Arc::clone(manager),
        root: SelectionRoot::Item(id.into()),
        steps: Vec::new(),
    }
}

/// A lazy, composable traversal over the live entity set.
///
/// Every composition method returns a new selection; the parent remains
/// valid and reusable. Nothing touches the registry until [`Self::query`].
#[derive(Clone)]
pub struct Selection {
    manager: Arc<ItemManager>,
    root: SelectionRoot,
    steps: Vec<Step>,
}

impl Selection {
    /// The stable root reference of this selection.
    #[must_use]
    pub fn root(&self) -> &SelectionRoot {
        &self.root
    }

    fn with_step(&self, step: Step) -> Self {
        let mut next = self.clone();
        next.steps.push(step);
        next
    }

    /// Narrows the current item set by a structured filter.
    #[must_use]
    pub fn filter(&self, filter: ItemFilter) -> Self {
        self.with_step(Step::Filter(filter))
    }

    /// Narrows the current item set by an arbitrary predicate.
    #[must_use]
    pub fn filter_fn(&self, predicate: impl Fn(&ItemRef) -> bool + Send + Sync + 'static) -> Self {
        self.with_step(Step::Filter(ItemFilter::by_predicate(predicate)))
    }

    /// Flat-maps each item to its parent; items without a parent
    /// contribute nothing.
    #[must_use]
    pub fn parent(&self) -> Self {
        self.with_step(Step::Parent)
    }

    /// Flat-maps each item to its live children.
    #[must_use]
    pub fn children(&self) -> Self {
        self.with_step(Step::Children)
    }

    /// Flat-maps each item to the links it is the source of.
    #[must_use]
    pub fn links(&self, filter: LinkFilter) -> Self {
        self.with_step(Step::Links(filter))
    }

    /// Flat-maps each item to the links it is the target of.
    #[must_use]
    pub fn refs(&self, filter: LinkFilter) -> Self {
        self.with_step(Step::Refs(filter))
    }

    /// Flat-maps each link to its target item.
    #[must_use]
    pub fn target(&self) -> Self {
        self.with_step(Step::Target)
    }

    /// Flat-maps each link to its source item.
    #[must_use]
    pub fn source(&self) -> Self {
        self.with_step(Step::Source)
    }

    /// Visits the current entity set without changing it. The escape hatch
    /// for folds: the visitor may thread an accumulator through captured
    /// state.
    #[must_use]
    pub fn call(&self, visitor: impl Fn(&[EntityRef]) + Send + Sync + 'static) -> Self {
        self.with_step(Step::Call(Arc::new(visitor)))
    }

    /// Executes the pipeline against the current registry state.
    ///
    /// Pure with respect to the selection itself; each invocation re-reads
    /// the registry.
    #[must_use]
    pub fn execute(&self, options: &QueryOptions) -> Vec<EntityRef> {
        let mut set: Vec<EntityRef> = match &self.root {
            SelectionRoot::Database => self
                .manager
                .items()
                .into_iter()
                .filter(|item| item_visible(item, options))
                .map(EntityRef::Item)
                .collect(),
            SelectionRoot::Item(id) => self
                .manager
                .get_item(id)
                .filter(|item| item_visible(item, options))
                .map(EntityRef::Item)
                .into_iter()
                .collect(),
        };

        for step in &self.steps {
            set = self.apply_step(step, set, options);
        }
        dedupe_by_id(set)
    }

    /// Materializes the selection: executes once, then re-executes on every
    /// registry change, notifying subscribers only on relevant changes.
    #[must_use]
    pub fn query(&self, options: QueryOptions) -> SelectionResult {
        let initial = self.execute(&options);
        let inner = Arc::new(ResultInner {
            selection: self.clone(),
            options,
            cached: Mutex::new(initial),
            changed: weft_graph::EventEmitter::new(),
        });

        let weak: Weak<ResultInner> = Arc::downgrade(&inner);
        let subscription = self.manager.on_updated(move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.on_registry_update(std::slice::from_ref(id));
            }
        });

        SelectionResult {
            inner,
            _subscription: subscription,
        }
    }

    fn apply_step(
        &self,
        step: &Step,
        set: Vec<EntityRef>,
        options: &QueryOptions,
    ) -> Vec<EntityRef> {
        match step {
            Step::Filter(filter) => set
                .into_iter()
                .filter(|entry| match entry {
                    EntityRef::Item(item) => {
                        item_visible(item, options) && filter.matches(item)
                    }
                    EntityRef::Link(_) => false,
                })
                .collect(),
            Step::Parent => self.map_items(set, options, |item| {
                item.parent_id
                    .as_ref()
                    .and_then(|parent| self.manager.get_item(parent))
                    .into_iter()
                    .collect()
            }),
            Step::Children => {
                self.map_items(set, options, |item| self.manager.children_of(&item.id))
            }
            Step::Links(filter) => self.map_items_to_links(set, filter, |item| {
                self.manager.links_of(&item.id)
            }),
            Step::Refs(filter) => self.map_items_to_links(set, filter, |item| {
                self.manager.refs_of(&item.id)
            }),
            Step::Target => self.map_links(set, options, |link| &link.target_id),
            Step::Source => self.map_links(set, options, |link| &link.source_id),
            Step::Call(visitor) => {
                visitor(&set);
                set
            }
        }
    }

    /// Flat-maps items through `f`, re-applying the ambient visibility
    /// filter to the results.
    fn map_items(
        &self,
        set: Vec<EntityRef>,
        options: &QueryOptions,
        f: impl Fn(&ItemRef) -> Vec<ItemRef>,
    ) -> Vec<EntityRef> {
        set.iter()
            .filter_map(EntityRef::as_item)
            .flat_map(|item| f(item))
            .filter(|item| item_visible(item, options))
            .map(EntityRef::Item)
            .collect()
    }

    fn map_items_to_links(
        &self,
        set: Vec<EntityRef>,
        filter: &LinkFilter,
        f: impl Fn(&ItemRef) -> Vec<LinkRef>,
    ) -> Vec<EntityRef> {
        set.iter()
            .filter_map(EntityRef::as_item)
            .flat_map(|item| f(item))
            .filter(|link| link.initialized && filter.matches(link))
            .map(EntityRef::Link)
            .collect()
    }

    fn map_links(
        &self,
        set: Vec<EntityRef>,
        options: &QueryOptions,
        endpoint: impl Fn(&LinkRef) -> &EntityId,
    ) -> Vec<EntityRef> {
        set.iter()
            .filter_map(EntityRef::as_link)
            .filter_map(|link| self.manager.get_item(endpoint(link)))
            .filter(|item| item_visible(item, options))
            .map(EntityRef::Item)
            .collect()
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("root", &self.root)
            .field("steps", &self.steps)
            .finish()
    }
}

fn item_visible(item: &ItemRef, options: &QueryOptions) -> bool {
    // Uninitialized entities are invisible no matter the deletion policy.
    if !item.initialized {
        return false;
    }
    match options.deleted {
        ShowDeleted::HideDeleted => !item.deleted,
        ShowDeleted::ShowDeleted => true,
        ShowDeleted::ShowDeletedOnly => item.deleted,
    }
}

/// Identity-dedupe (by id), preserving first-seen order.
fn dedupe_by_id(set: Vec<EntityRef>) -> Vec<EntityRef> {
    let mut seen = HashSet::new();
    set.into_iter()
        .filter(|entry| seen.insert(entry.id().clone()))
        .collect()
}

struct ResultInner {
    selection: Selection,
    options: QueryOptions,
    cached: Mutex<Vec<EntityRef>>,
    changed: weft_graph::EventEmitter<Vec<EntityId>>,
}

impl ResultInner {
    fn on_registry_update(&self, changed_ids: &[EntityId]) {
        let new = self.selection.execute(&self.options);

        let relevant = {
            let cached = self.cached.lock().expect("selection cache poisoned");
            let union: HashSet<&EntityId> = new
                .iter()
                .map(EntityRef::id)
                .chain(cached.iter().map(EntityRef::id))
                .collect();
            changed_ids.iter().any(|id| union.contains(id))
        };

        // Cache is replaced whether or not subscribers are notified.
        *self.cached.lock().expect("selection cache poisoned") = new;

        if relevant {
            trace!(?changed_ids, "selection result changed, notifying");
            self.changed.emit(&changed_ids.to_vec());
        }
    }
}

/// A materialized, reactive selection result.
pub struct SelectionResult {
    inner: Arc<ResultInner>,
    _subscription: Subscription,
}

impl SelectionResult {
    /// The current result set, identity-deduped.
    #[must_use]
    pub fn result(&self) -> Vec<EntityRef> {
        self.inner
            .cached
            .lock()
            .expect("selection cache poisoned")
            .clone()
    }

    /// The current result set restricted to items.
    #[must_use]
    pub fn items(&self) -> Vec<ItemRef> {
        self.result()
            .into_iter()
            .filter_map(|entry| match entry {
                EntityRef::Item(item) => Some(item),
                EntityRef::Link(_) => None,
            })
            .collect()
    }

    /// The current result set restricted to links.
    #[must_use]
    pub fn links(&self) -> Vec<LinkRef> {
        self.result()
            .into_iter()
            .filter_map(|entry| match entry {
                EntityRef::Link(link) => Some(link),
                EntityRef::Item(_) => None,
            })
            .collect()
    }

    /// The stable root of the underlying selection.
    #[must_use]
    pub fn root(&self) -> &SelectionRoot {
        &self.inner.selection.root
    }

    /// Subscribes to relevant-change notifications. The callback receives
    /// the ids that triggered the re-execution.
    #[must_use]
    pub fn on_update(
        &self,
        callback: impl Fn(&Vec<EntityId>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.changed.subscribe(callback)
    }
}
