//! Composable, lazily-evaluated, reactive queries over a Weft graph.
//!
//! A [`Selection`] is a pipeline of traversal steps rooted at the whole
//! database or a single item. Composition is cheap and lazy: each step
//! returns a new selection, never mutating its parent, and nothing executes
//! until [`Selection::query`] materializes a [`SelectionResult`].
//!
//! Results are reactive: a materialized result re-executes on every
//! registry change and notifies its own subscribers only when the changed
//! entities intersect the union of the old and new result sets — churn
//! elsewhere in the graph stays silent.
//!
//! Soft-deleted items are excluded by default; pass
//! [`ShowDeleted::ShowDeleted`] or [`ShowDeleted::ShowDeletedOnly`] to
//! change that. Entities whose model is not yet attached are always
//! excluded, regardless of the deletion policy.

mod filter;
mod selection;

pub use filter::{ItemFilter, LinkFilter};
pub use selection::{select, select_item, Selection, SelectionResult, SelectionRoot};

/// Soft-deletion visibility policy for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShowDeleted {
    /// Exclude items flagged deleted (the default).
    #[default]
    HideDeleted,
    /// Include deleted and live items alike.
    ShowDeleted,
    /// Include only deleted items.
    ShowDeletedOnly,
}

/// Options applied when a selection is materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub deleted: ShowDeleted,
}

impl QueryOptions {
    /// Options with the given deletion visibility.
    #[must_use]
    pub fn with_deleted(deleted: ShowDeleted) -> Self {
        Self { deleted }
    }
}
