//! Node records for the synchronization tree
//!
//! Nodes live in a flat arena owned by the model; parents are plain
//! back-indexes into the same arena, so the ownership graph stays acyclic.
//! Each record carries the shared header (parent, location, memoized kind,
//! memoized children) plus a variant payload.

use crate::kind::{ChangeKind, Direction};
use synctree_core::{ChangeSource, CommitId, ObjectId};

/// Handle to a node in a [`SyncModel`](crate::SyncModel) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Variant of a model node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// The root: one repository being synchronized
    Repository,
    /// One partitioned commit, or an index/working-copy pseudo-commit
    Commit,
    /// A changed directory
    Tree,
    /// A changed file
    Blob,
}

/// What a commit node represents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitPayload {
    /// A commit from the partitioned history
    Revision {
        /// The commit being represented
        remote: CommitId,
        /// First parent, `None` for a root commit
        base: Option<CommitId>,
        /// Common ancestor of the parent set, `None` when there is none
        ancestor: Option<CommitId>,
        /// Which partition set the commit came from
        side: Direction,
        /// First line of the commit message
        summary: String,
        /// Commit timestamp, Unix milliseconds
        timestamp_ms: u64,
    },
    /// A pseudo-commit built from a flat change list
    Flat {
        /// Index or working copy
        source: ChangeSource,
    },
}

/// The three content ids of a tree or blob node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentIds {
    /// Common-ancestor side ([`ObjectId::ZERO`] when absent)
    pub ancestor: ObjectId,
    /// Local ("base") side
    pub base: ObjectId,
    /// Remote side
    pub remote: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepositoryData {
    pub local_tip: CommitId,
    pub remote_tip: CommitId,
    pub include_working_state: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeData {
    Repository(RepositoryData),
    Commit(CommitPayload),
    /// Ids are the child trees on each side, driving lazy recursion
    Tree(ContentIds),
    Blob(ContentIds),
}

/// One arena record: shared header plus variant payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    /// Non-owning back-reference; `None` only for the root
    pub parent: Option<NodeId>,
    /// Repository-relative path, empty for repository and commit nodes
    pub location: String,
    /// Classification, memoized on first access
    pub kind: Option<ChangeKind>,
    /// Child ids, memoized on first materialization; `None` = not yet built
    pub children: Option<Vec<NodeId>>,
    pub data: NodeData,
}

impl Node {
    pub(crate) fn node_type(&self) -> NodeType {
        match self.data {
            NodeData::Repository(_) => NodeType::Repository,
            NodeData::Commit(_) => NodeType::Commit,
            NodeData::Tree(_) => NodeType::Tree,
            NodeData::Blob(_) => NodeType::Blob,
        }
    }
}
