//! Data service host: the streaming replication boundary.
//!
//! Exposes one local graph to a single remote logical consumer (a party):
//! a subscription to the live entity set, a per-entity snapshot-then-
//! mutations stream, and one write path back into the outbound log.
//!
//! The host only reads the registry. Its sole mutation path is the
//! outbound write, which never touches local state: a locally-authored
//! mutation round-trips through the log and re-enters via the
//! demultiplexer, so there is exactly one code path for state change.

mod error;
mod host;
mod protocol;
mod writer;

pub use error::{HostError, HostResult};
pub use host::{DataServiceHost, EntitySetStream, EntityStream};
pub use protocol::{EntityInfo, EntitySetDelta, EntityStreamMessage, WriteReceipt};
pub use writer::{FeedWriter, MemoryFeedWriter};
