//! Error types for the replication boundary.

use thiserror::Error;
use weft_types::EntityId;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors that can occur at the replication boundary.
#[derive(Debug, Error)]
pub enum HostError {
    /// The named entity is unknown at subscribe time. Recoverable: given
    /// asynchronous model registration and feed delivery, "not yet present"
    /// is a normal race, not a fatal condition.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The host was constructed without a write capability.
    #[error("host is read-only: no outbound feed writer")]
    ReadOnly,

    /// The outbound writer rejected the append. Constructed by `FeedWriter`
    /// implementations over real transports.
    #[error("feed writer error: {0}")]
    Writer(String),

    /// Error surfaced from the graph core.
    #[error(transparent)]
    Graph(#[from] weft_graph::GraphError),
}
