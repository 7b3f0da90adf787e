//! Object-store boundary for the synchronization model
//!
//! This crate defines the narrow interface the model consumes:
//! - Opaque 32-byte content ids with a zero "absent" sentinel
//! - Tree and tree-entry value types
//! - The [`ObjectStore`] trait (revision lookup, commit/tree reads,
//!   three-way tree diffing, merge-base queries, flat change lists)
//! - An in-memory reference store for tests and embedders

pub mod id;
pub mod memory;
pub mod store;
pub mod tree;

pub use id::{CommitId, ObjectId, TreeId};
pub use memory::MemoryStore;
pub use store::{
    Change, ChangeSource, CommitMeta, ObjectStore, Operation, SideEntry, StoreError,
    StoreResult, ThreeWayEntry,
};
pub use tree::{EntryKind, Tree, TreeEntry};
