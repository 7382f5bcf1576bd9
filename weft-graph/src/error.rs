//! Error types for the graph core.

use thiserror::Error;
use weft_types::EntityId;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur in graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An entity with this id already exists in the registry.
    #[error("duplicate entity id: {0}")]
    DuplicateId(EntityId),

    /// A link names an endpoint that does not resolve to an existing item.
    #[error("dangling reference: link {link} names missing item {missing}")]
    DanglingReference { link: EntityId, missing: EntityId },

    /// No entity with this id exists in the registry.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The id given is an item where a link was required, or vice versa.
    #[error("entity {0} is not an item")]
    NotAnItem(EntityId),

    /// The id given is a link where an item was required.
    #[error("entity {0} is not a link")]
    NotALink(EntityId),

    /// A constructed entity's id does not match the record that produced it.
    #[error("constructed entity id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: EntityId, actual: EntityId },

    /// The inbound record violates the wire contract (e.g. a mutation for
    /// an entity that was never constructed). Indicates a corrupt log or an
    /// upstream logic bug.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Snapshot restore could not order entities parent-before-child.
    #[error("cannot topologically sort snapshot: missing parent or cycle involving {0:?}")]
    TopologicalSort(Vec<EntityId>),

    /// Error surfaced from an entity's model.
    #[error(transparent)]
    Model(#[from] weft_model::ModelError),
}
