//! Pluggable data-model runtime for Weft.
//!
//! The graph core treats an entity's data model as an opaque state machine:
//! it routes mutations in, asks for snapshots out, and restores from
//! snapshots wholesale. Everything else — field semantics, conflict
//! resolution, serialization format — belongs to the model implementation.
//!
//! Models are independently versioned plugins that may load after entities
//! referencing them have already arrived on the feed. Until the named model
//! type is registered, an entity's state is [`ModelState::Uninitialized`]
//! and incoming mutations accumulate in a backlog that is replayed, in
//! arrival order, once the model attaches.

mod document;
mod factory;
mod model;
mod state;

pub use document::{DocumentModel, DOCUMENT_MODEL_TYPE};
pub use factory::ModelFactory;
pub use model::{Model, ModelConstructor, ModelError, ModelResult};
pub use state::{Backlog, BacklogPolicy, ModelState};
