//! Replicated object-graph core for Weft.
//!
//! An ordered, append-only stream of mutation records is turned into a
//! live, queryable graph of typed entities. Two entity kinds exist: items
//! (tree-positioned via a parent id) and links (directed edges between two
//! items). Each entity's field-level data is governed by a pluggable model
//! that may be registered after the entity has already arrived.
//!
//! # Components
//!
//! - **Entity model** ([`entity`]): item and link records, arena-style —
//!   every cross-entity reference is an id resolved through the registry.
//! - **Item manager** ([`manager`]): the authoritative registry; constructs
//!   entities, attaches models, routes mutations, emits change events.
//! - **Item demultiplexer** ([`demuxer`]): classifies inbound records
//!   (genesis / item-mutation / model-mutation / snapshot) and drives the
//!   manager; also exports and restores whole-graph snapshots.
//!
//! All registry mutation is synchronous: one inbound record is fully
//! applied, including synchronous subscriber callbacks, before the next is
//! processed. Async consumers sit behind the coalescing primitives in
//! [`event`].

mod demuxer;
mod entity;
mod error;
pub mod event;
mod manager;

pub use demuxer::ItemDemuxer;
pub use entity::{EntityKind, EntityRef, ItemRef, LinkRef};
pub use error::{GraphError, GraphResult};
pub use event::{EventEmitter, Subscription, UpdateBatcher};
pub use manager::{ItemManager, ManagerConfig, MutationNotice};
