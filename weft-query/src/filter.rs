//! Structured filters over items and links.
//!
//! Structured fields (id, type, parent) are sugar over predicates: a filter
//! matches when every present field matches and the predicate, if any,
//! accepts the item.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use weft_graph::{ItemRef, LinkRef};
use weft_types::EntityId;

type Predicate = Arc<dyn Fn(&ItemRef) -> bool + Send + Sync>;

/// Filter over items.
#[derive(Clone, Default)]
pub struct ItemFilter {
    id: Option<EntityId>,
    types: Option<BTreeSet<String>>,
    parent: Option<EntityId>,
    predicate: Option<Predicate>,
}

impl ItemFilter {
    /// A filter matching everything.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Exact-match on the item id.
    #[must_use]
    pub fn by_id(id: impl Into<EntityId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Match a single item type.
    #[must_use]
    pub fn by_type(item_type: impl Into<String>) -> Self {
        Self {
            types: Some(BTreeSet::from([item_type.into()])),
            ..Self::default()
        }
    }

    /// Match any of a set of item types (OR semantics).
    #[must_use]
    pub fn by_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: Some(types.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Match items whose parent has the given id. Accepts anything
    /// convertible to an id, so an [`ItemRef`]'s id works directly.
    #[must_use]
    pub fn by_parent(parent: impl Into<EntityId>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    /// Arbitrary predicate escape hatch.
    #[must_use]
    pub fn by_predicate(predicate: impl Fn(&ItemRef) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Some(Arc::new(predicate)),
            ..Self::default()
        }
    }

    /// Adds an id constraint.
    #[must_use]
    pub fn id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a parent constraint.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<EntityId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Adds a predicate constraint.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Fn(&ItemRef) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Returns true if the item passes every present constraint.
    #[must_use]
    pub fn matches(&self, item: &ItemRef) -> bool {
        if let Some(id) = &self.id {
            if &item.id != id {
                return false;
            }
        }
        if let Some(types) = &self.types {
            match &item.item_type {
                Some(item_type) if types.contains(item_type) => {}
                _ => return false,
            }
        }
        if let Some(parent) = &self.parent {
            if item.parent_id.as_ref() != Some(parent) {
                return false;
            }
        }
        if let Some(predicate) = &self.predicate {
            if !predicate(item) {
                return false;
            }
        }
        true
    }
}

impl fmt::Debug for ItemFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemFilter")
            .field("id", &self.id)
            .field("types", &self.types)
            .field("parent", &self.parent)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Filter over links, by link type.
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    types: Option<BTreeSet<String>>,
}

impl LinkFilter {
    /// A filter matching every link.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Match a single link type.
    #[must_use]
    pub fn by_type(link_type: impl Into<String>) -> Self {
        Self {
            types: Some(BTreeSet::from([link_type.into()])),
        }
    }

    /// Match any of a set of link types.
    #[must_use]
    pub fn by_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: Some(types.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns true if the link passes the type constraint, if any.
    #[must_use]
    pub fn matches(&self, link: &LinkRef) -> bool {
        match &self.types {
            Some(types) => matches!(&link.item_type, Some(t) if types.contains(t)),
            None => true,
        }
    }
}
