//! Three-way repository synchronization model
//!
//! Given two revisions of a versioned tree (a local and a remote endpoint,
//! optionally including live uncommitted state), this crate computes which
//! history and content differ between them and exposes the difference as a
//! navigable, lazily-materialized tree:
//! repository → commit → directory → file.
//!
//! The pieces, leaves first:
//! - [`ancestor`]: common-ancestor resolution for a commit's parent set
//! - [`partition`]: splitting the two-tip commit graph into "only local"
//!   and "only remote" sets without a full history walk
//! - `walk` (internal): three-way tree diffing that skips unchanged
//!   subtrees and recurses only on demand
//! - `flat` (internal): rebuilding a directory hierarchy from the flat
//!   change lists of the index and working copy
//! - [`SyncModel`]: the root orchestrator and node arena
//!
//! The object store underneath is consumed through
//! [`synctree_core::ObjectStore`] and never written to.

pub mod ancestor;
pub mod cancel;
pub mod error;
pub mod kind;
pub mod model;
pub mod node;
pub mod partition;

mod flat;
mod walk;

pub use cancel::CancelToken;
pub use error::{ModelError, ModelResult};
pub use kind::{classify, ChangeKind, Direction};
pub use model::{SyncModel, SyncOptions};
pub use node::{CommitPayload, ContentIds, NodeId, NodeType};
pub use partition::{partition, Partition};

// The operation half of a classification comes from the store boundary
pub use synctree_core::Operation;
