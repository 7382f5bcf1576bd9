use std::sync::Arc;
use weft_types::{EntityId, MessageMeta};

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in model operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The mutation payload does not match the model's wire format.
    #[error("invalid mutation for model '{model_type}': {reason}")]
    InvalidMutation { model_type: String, reason: String },

    /// The snapshot payload does not match the model's wire format.
    #[error("invalid snapshot for model '{model_type}': {reason}")]
    InvalidSnapshot { model_type: String, reason: String },

    /// No constructor registered for the named model type.
    #[error("unknown model type: {0}")]
    UnknownModel(String),

    /// A constructor for this model type is already registered.
    #[error("model type already registered: {0}")]
    AlreadyRegistered(String),
}

/// An entity's data model: an opaque state machine owned by the registry.
///
/// The core calls `apply` for every incremental mutation routed to the
/// entity and `restore` when a full snapshot resets the state wholesale.
/// Implementations own conflict resolution; the core guarantees only that
/// mutations for one entity are applied in feed-arrival order.
pub trait Model: Send {
    /// The model type this instance implements (e.g. `weft.document`).
    fn type_name(&self) -> &str;

    /// Applies one mutation with its delivery metadata.
    ///
    /// On error the model must retain its last-known-good state.
    fn apply(&mut self, mutation: &serde_json::Value, meta: &MessageMeta) -> ModelResult<()>;

    /// Returns the full current state as an opaque snapshot.
    fn snapshot(&self) -> serde_json::Value;

    /// Replaces the full state from a snapshot, bypassing incremental apply.
    fn restore(&mut self, snapshot: &serde_json::Value) -> ModelResult<()>;
}

/// Constructor for model instances, registered per model type.
pub type ModelConstructor = Arc<dyn Fn(&EntityId) -> Box<dyn Model> + Send + Sync>;
