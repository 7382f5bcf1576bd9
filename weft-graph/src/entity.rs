//! Entity records and their public views.
//!
//! Entities live inside the registry arena; every cross-entity reference
//! (parent, link endpoints, children/links/refs back-sets) is stored as an
//! id and resolved through the registry on access. Consumers never hold
//! direct pointers between entities, which sidesteps reference cycles and
//! keeps the registry the single owner.

use weft_model::ModelState;
use weft_types::EntityId;

/// An entity stored in the registry arena.
#[derive(Debug)]
pub(crate) enum EntityRecord {
    Item(ItemRecord),
    Link(LinkRecord),
}

impl EntityRecord {
    pub(crate) fn id(&self) -> &EntityId {
        match self {
            Self::Item(item) => &item.id,
            Self::Link(link) => &link.id,
        }
    }

    pub(crate) fn state(&self) -> &ModelState {
        match self {
            Self::Item(item) => &item.state,
            Self::Link(link) => &link.state,
        }
    }

    pub(crate) fn state_mut(&mut self) -> &mut ModelState {
        match self {
            Self::Item(item) => &mut item.state,
            Self::Link(link) => &mut link.state,
        }
    }
}

/// An item: an entity with a tree position (parent id) and a soft-delete
/// flag. Children/links/refs back-sets are derived indexes maintained by
/// the registry, never mutated directly.
#[derive(Debug)]
pub(crate) struct ItemRecord {
    pub id: EntityId,
    pub item_type: Option<String>,
    pub parent_id: Option<EntityId>,
    pub deleted: bool,
    pub state: ModelState,
}

/// A link: a directed edge between two items. Endpoints are immutable once
/// created and must resolve to existing items at construction.
#[derive(Debug)]
pub(crate) struct LinkRecord {
    pub id: EntityId,
    pub item_type: Option<String>,
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub state: ModelState,
}

/// Which kind of entity an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Item,
    Link,
}

/// Read-only view of an item, cloned out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub id: EntityId,
    pub item_type: Option<String>,
    pub model_type: String,
    pub parent_id: Option<EntityId>,
    pub deleted: bool,
    /// False while the model type is unregistered and the entity is
    /// therefore invisible to queries.
    pub initialized: bool,
}

/// Read-only view of a link, cloned out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub id: EntityId,
    pub item_type: Option<String>,
    pub model_type: String,
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub initialized: bool,
}

/// Read-only view of either entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Item(ItemRef),
    Link(LinkRef),
}

impl EntityRef {
    /// The entity's id.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Item(item) => &item.id,
            Self::Link(link) => &link.id,
        }
    }

    /// The entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Item(_) => EntityKind::Item,
            Self::Link(_) => EntityKind::Link,
        }
    }

    /// The item view, if this is an item.
    #[must_use]
    pub fn as_item(&self) -> Option<&ItemRef> {
        match self {
            Self::Item(item) => Some(item),
            Self::Link(_) => None,
        }
    }

    /// The link view, if this is a link.
    #[must_use]
    pub fn as_link(&self) -> Option<&LinkRef> {
        match self {
            Self::Link(link) => Some(link),
            Self::Item(_) => None,
        }
    }
}

impl ItemRecord {
    pub(crate) fn to_ref(&self) -> ItemRef {
        ItemRef {
            id: self.id.clone(),
            item_type: self.item_type.clone(),
            model_type: self.state.model_type().to_string(),
            parent_id: self.parent_id.clone(),
            deleted: self.deleted,
            initialized: self.state.is_attached(),
        }
    }
}

impl LinkRecord {
    pub(crate) fn to_ref(&self) -> LinkRef {
        LinkRef {
            id: self.id.clone(),
            item_type: self.item_type.clone(),
            model_type: self.state.model_type().to_string(),
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            initialized: self.state.is_attached(),
        }
    }
}
