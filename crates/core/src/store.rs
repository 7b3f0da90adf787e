//! The object-store boundary consumed by the synchronization model
//!
//! The model never decodes commits or trees itself; everything it needs is
//! behind [`ObjectStore`]: revision lookup, commit and tree reads, merge-base
//! queries, a three-way tree diff that only reports differing entries, and
//! the flat change lists of the index and working copy.

use crate::id::{CommitId, ObjectId, TreeId};
use crate::tree::{EntryKind, Tree};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

/// Errors originating in the object store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached or opened
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    /// A commit or tree id cannot be decoded
    #[error("corrupt or unreadable object {0}")]
    CorruptObject(ObjectId),
    /// A revision name does not resolve to a commit
    #[error("unknown revision '{0}'")]
    UnknownRevision(String),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What a flat change did to its path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Path did not exist before
    Addition,
    /// Path no longer exists
    Deletion,
    /// Path exists on both sides with different content
    Modification,
}

/// Where a flat change list comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeSource {
    /// The staging area
    Index,
    /// Live uncommitted edits
    WorkingCopy,
}

impl ChangeSource {
    /// Human-readable label, used as the pseudo-commit name
    pub fn label(&self) -> &'static str {
        match self {
            ChangeSource::Index => "index",
            ChangeSource::WorkingCopy => "working copy",
        }
    }
}

/// One changed path as reported by the index or working copy
///
/// Flat change lists have no recursive tree form; the model reconstructs
/// the directory hierarchy from these records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Repository-relative path, `/`-separated
    pub path: String,
    /// What happened to the path
    pub operation: Operation,
    /// Content id before the change ([`ObjectId::ZERO`] for additions)
    pub old_id: ObjectId,
    /// Content id after the change ([`ObjectId::ZERO`] for deletions)
    pub new_id: ObjectId,
}

impl Change {
    /// An added path
    pub fn added(path: impl Into<String>, new_id: ObjectId) -> Self {
        Self {
            path: path.into(),
            operation: Operation::Addition,
            old_id: ObjectId::ZERO,
            new_id,
        }
    }

    /// A deleted path
    pub fn deleted(path: impl Into<String>, old_id: ObjectId) -> Self {
        Self {
            path: path.into(),
            operation: Operation::Deletion,
            old_id,
            new_id: ObjectId::ZERO,
        }
    }

    /// A modified path
    pub fn modified(path: impl Into<String>, old_id: ObjectId, new_id: ObjectId) -> Self {
        Self {
            path: path.into(),
            operation: Operation::Modification,
            old_id,
            new_id,
        }
    }
}

/// Decoded commit header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    /// Parent commits, first parent first
    pub parents: SmallVec<[CommitId; 2]>,
    /// Root tree of the commit's snapshot
    pub tree: TreeId,
    /// Commit timestamp, Unix milliseconds
    pub timestamp_ms: u64,
    /// First line of the commit message
    pub summary: String,
}

/// One side of a three-way diff entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideEntry {
    /// Entry kind on this side, `None` when the path is absent
    pub kind: Option<EntryKind>,
    /// Content id on this side, [`ObjectId::ZERO`] when absent
    pub id: ObjectId,
}

impl SideEntry {
    /// The absent side
    pub const ABSENT: SideEntry = SideEntry {
        kind: None,
        id: ObjectId::ZERO,
    };

    /// A present side
    pub fn present(kind: EntryKind, id: ObjectId) -> Self {
        Self {
            kind: Some(kind),
            id,
        }
    }

    /// Whether the path exists on this side
    pub fn is_present(&self) -> bool {
        self.kind.is_some()
    }

    /// Whether this side is a directory
    pub fn is_tree(&self) -> bool {
        matches!(self.kind, Some(EntryKind::Tree))
    }
}

/// One differing entry from a three-way tree diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeWayEntry {
    /// Entry name within the diffed directory level
    pub name: String,
    /// The common-ancestor side
    pub ancestor: SideEntry,
    /// The local ("base") side
    pub base: SideEntry,
    /// The remote side
    pub remote: SideEntry,
}

/// Read-only access to a versioned object store
///
/// Implementations must be safe for concurrent readers; the model never
/// writes through this interface.
pub trait ObjectStore: Send + Sync {
    /// Resolve a revision name (branch, tag, hex id) to a commit id
    fn resolve_revision(&self, name: &str) -> StoreResult<CommitId>;

    /// Read a commit header
    fn read_commit(&self, id: CommitId) -> StoreResult<CommitMeta>;

    /// Find the most recent commit reachable from every start point
    ///
    /// Returns `None` when the start points share no history.
    fn merge_base(&self, heads: &[CommitId]) -> StoreResult<Option<CommitId>>;

    /// Read a single tree object
    fn read_tree(&self, id: TreeId) -> StoreResult<Tree>;

    /// Diff one directory level across three variants
    ///
    /// `None` stands for an empty tree on that side. The result contains
    /// only entries that differ somewhere across the three sides; entries
    /// identical in kind and id on all three sides are never reported.
    fn diff_trees(
        &self,
        ancestor: Option<TreeId>,
        base: Option<TreeId>,
        remote: Option<TreeId>,
    ) -> StoreResult<Vec<ThreeWayEntry>>;

    /// Flat change list of the index or working copy
    fn flat_changes(&self, source: ChangeSource) -> StoreResult<Vec<Change>>;
}
