//! Model attachment state.
//!
//! "Model not yet registered" is an explicit variant, not a nullable field,
//! so every caller is forced to handle both states.

use crate::Model;
use std::collections::VecDeque;
use std::fmt;
use tracing::warn;
use weft_types::MessageMeta;

/// Buffering policy for mutations that arrive before the entity's model
/// type is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklogPolicy {
    /// Keep every pre-registration mutation.
    Unbounded,
    /// Keep at most `n` mutations, dropping the oldest on overflow.
    Bounded(usize),
}

impl Default for BacklogPolicy {
    fn default() -> Self {
        Self::Unbounded
    }
}

/// Ordered buffer of mutations awaiting model attachment.
#[derive(Default)]
pub struct Backlog {
    entries: VecDeque<(serde_json::Value, MessageMeta)>,
    policy: BacklogPolicy,
}

impl Backlog {
    /// Creates an empty backlog with the given policy.
    #[must_use]
    pub fn new(policy: BacklogPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            policy,
        }
    }

    /// Appends a mutation, evicting the oldest entry if the policy bounds
    /// the backlog and it is full.
    pub fn push(&mut self, mutation: serde_json::Value, meta: MessageMeta) {
        if let BacklogPolicy::Bounded(cap) = self.policy {
            if self.entries.len() >= cap {
                if let Some((_, evicted)) = self.entries.pop_front() {
                    warn!(
                        feed = %evicted.feed_key,
                        seq = evicted.seq,
                        "backlog full, dropping oldest pre-registration mutation"
                    );
                }
            }
        }
        self.entries.push_back((mutation, meta));
    }

    /// Drains all buffered mutations in original arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = (serde_json::Value, MessageMeta)> + '_ {
        self.entries.drain(..)
    }

    /// Returns the number of buffered mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The attachment state of an entity's model.
pub enum ModelState {
    /// The named model type is not yet registered locally. Mutations
    /// destined for the entity accumulate in the backlog; a snapshot
    /// arriving in this state supersedes the backlog and is restored
    /// first on attachment.
    Uninitialized {
        model_type: String,
        backlog: Backlog,
        pending_snapshot: Option<serde_json::Value>,
    },
    /// The model is attached and live. Attachment happens at most once.
    Attached(Box<dyn Model>),
}

impl ModelState {
    /// Creates an uninitialized state for a model type.
    #[must_use]
    pub fn uninitialized(model_type: impl Into<String>, policy: BacklogPolicy) -> Self {
        Self::Uninitialized {
            model_type: model_type.into(),
            backlog: Backlog::new(policy),
            pending_snapshot: None,
        }
    }

    /// The model type this state is bound to.
    #[must_use]
    pub fn model_type(&self) -> &str {
        match self {
            Self::Uninitialized { model_type, .. } => model_type,
            Self::Attached(model) => model.type_name(),
        }
    }

    /// Returns true if a model is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attached(_))
    }
}

impl fmt::Debug for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized {
                model_type,
                backlog,
                pending_snapshot,
            } => f
                .debug_struct("Uninitialized")
                .field("model_type", model_type)
                .field("backlog_len", &backlog.len())
                .field("has_pending_snapshot", &pending_snapshot.is_some())
                .finish(),
            Self::Attached(model) => f
                .debug_struct("Attached")
                .field("model_type", &model.type_name())
                .finish(),
        }
    }
}
