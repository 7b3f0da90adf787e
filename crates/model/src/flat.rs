//! Hierarchy reconstruction from flat change lists
//!
//! The index and the working copy report changes as flat path lists with no
//! recursive tree form. This module rebuilds the directory/file node
//! structure from those lists in a single pass: directory nodes are created
//! on first reference (memoized by cumulative path prefix, so the pass is
//! linear in total path length) and accumulate children as later changes
//! land beneath them. The forest is only handed out once complete, so a
//! failed or cancelled build leaves nothing half-assembled behind.

use crate::cancel::CancelToken;
use crate::error::ModelResult;
use crate::kind::{ChangeKind, Direction};
use ahash::AHashMap;
use synctree_core::{Change, ObjectId, Operation};
use tracing::{debug, warn};

/// Index of a node within its [`FlatForest`]
pub(crate) type FlatIndex = usize;

/// Payload of a reconstructed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FlatData {
    /// An inferred directory
    Tree,
    /// A changed file
    Blob { old_id: ObjectId, new_id: ObjectId },
}

/// One reconstructed directory or file node
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlatNode {
    pub location: String,
    pub kind: ChangeKind,
    pub data: FlatData,
    /// Children in first-reference order; sealed once the build returns
    pub children: Vec<FlatIndex>,
}

/// A completed reconstruction: top-level nodes plus the shared node table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FlatForest {
    pub nodes: Vec<FlatNode>,
    pub roots: Vec<FlatIndex>,
}

/// Nodes already created for a path prefix, one per role
///
/// A prefix can carry both roles when the list reports a type change (a
/// file deleted and paths added beneath the same name); the file node and
/// the directory node stay separate so file nodes never grow children.
#[derive(Debug, Clone, Copy, Default)]
struct PrefixSlot {
    tree: Option<FlatIndex>,
    blob: Option<FlatIndex>,
}

/// Rebuild the directory/file hierarchy for a flat change list
///
/// Every distinct directory prefix in `changes` yields exactly one tree
/// node whose children are the immediate segments beneath it that occur in
/// the list. Flat sources are local edits, so every node classifies as
/// outgoing. A path reported both as a file and as a directory prefix
/// keeps one node per role. An empty list yields an empty forest.
pub(crate) fn build_forest(changes: &[Change], cancel: &CancelToken) -> ModelResult<FlatForest> {
    let mut forest = FlatForest::default();
    // cumulative path prefix -> created nodes; the memo that makes repeated
    // directory references cheap and guards against duplicate insertion
    let mut by_prefix: AHashMap<String, PrefixSlot> = AHashMap::new();

    for change in changes {
        cancel.check()?;

        let mut parent: Option<FlatIndex> = None;
        let mut prefix = String::with_capacity(change.path.len());
        let mut segments = change.path.split('/').filter(|s| !s.is_empty()).peekable();

        while let Some(segment) = segments.next() {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            let is_leaf = segments.peek().is_none();

            let slot = by_prefix.entry(prefix.clone()).or_default();
            let existing = if is_leaf { slot.blob } else { slot.tree };
            if let Some(index) = existing {
                if is_leaf {
                    // Same path reported twice; keep the first record
                    warn!(path = %change.path, "duplicate flat change ignored");
                }
                parent = Some(index);
                continue;
            }

            let node = if is_leaf {
                FlatNode {
                    location: prefix.clone(),
                    kind: ChangeKind::new(Direction::Outgoing, change.operation),
                    data: FlatData::Blob {
                        old_id: change.old_id,
                        new_id: change.new_id,
                    },
                    children: Vec::new(),
                }
            } else {
                FlatNode {
                    location: prefix.clone(),
                    kind: ChangeKind::new(Direction::Outgoing, Operation::Modification),
                    data: FlatData::Tree,
                    children: Vec::new(),
                }
            };

            let index = forest.nodes.len();
            forest.nodes.push(node);
            if is_leaf {
                slot.blob = Some(index);
            } else {
                slot.tree = Some(index);
            }
            match parent {
                Some(parent_index) => forest.nodes[parent_index].children.push(index),
                None => forest.roots.push(index),
            }
            parent = Some(index);
        }
    }

    debug!(
        changes = changes.len(),
        nodes = forest.nodes.len(),
        "rebuilt tree from flat changes"
    );
    Ok(forest)
}
