//! Three-way tree walk: one node seed per changed path
//!
//! The walk is deliberately shallow: it diffs a single directory level and
//! emits seeds. Directory seeds carry the three child-tree ids and are
//! recursed into only when their node's children are requested, so
//! unchanged subtrees are never opened and stack depth never tracks tree
//! depth.

use crate::cancel::CancelToken;
use crate::error::ModelResult;
use crate::kind::{classify, ChangeKind};
use synctree_core::{ObjectId, ObjectStore, SideEntry, TreeId};
use tracing::trace;

/// Payload of a node seed produced by the walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SeedData {
    /// A changed directory; ids are the child trees on each side
    /// ([`ObjectId::ZERO`] where the path is absent or not a directory)
    Tree {
        ancestor: TreeId,
        base: TreeId,
        remote: TreeId,
    },
    /// A changed file or symlink; ids are the content ids on each side
    Blob {
        ancestor: ObjectId,
        base: ObjectId,
        remote: ObjectId,
    },
}

/// One changed path found at a directory level
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeSeed {
    pub location: String,
    pub kind: ChangeKind,
    pub data: SeedData,
}

fn join_location(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn present(id: TreeId) -> Option<TreeId> {
    (!id.is_zero()).then_some(id)
}

/// Diff one directory level across ancestor/base/remote and emit seeds
///
/// Tree ids equal across all three sides short-circuit without touching the
/// store. A store failure aborts this level and propagates; no partial
/// seed list is returned.
pub(crate) fn walk_level(
    store: &dyn ObjectStore,
    ancestor: TreeId,
    base: TreeId,
    remote: TreeId,
    parent_location: &str,
    cancel: &CancelToken,
) -> ModelResult<Vec<NodeSeed>> {
    if ancestor == base && base == remote {
        return Ok(Vec::new());
    }

    let entries = store.diff_trees(present(ancestor), present(base), present(remote))?;
    trace!(
        location = parent_location,
        changed = entries.len(),
        "diffed directory level"
    );

    let mut seeds = Vec::with_capacity(entries.len());
    for entry in entries {
        cancel.check()?;

        let location = join_location(parent_location, &entry.name);
        let kind = classify(entry.ancestor.id, entry.base.id, entry.remote.id);

        // A path that is a directory in any variant becomes a tree node;
        // sides where it is a file (or absent) contribute no child tree.
        let is_dir = entry.ancestor.is_tree() || entry.base.is_tree() || entry.remote.is_tree();
        let data = if is_dir {
            let child = |side: SideEntry| if side.is_tree() { side.id } else { ObjectId::ZERO };
            SeedData::Tree {
                ancestor: child(entry.ancestor),
                base: child(entry.base),
                remote: child(entry.remote),
            }
        } else {
            SeedData::Blob {
                ancestor: entry.ancestor.id,
                base: entry.base.id,
                remote: entry.remote.id,
            }
        };

        seeds.push(NodeSeed {
            location,
            kind,
            data,
        });
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::kind::Direction;
    use synctree_core::id::hash_bytes;
    use synctree_core::{MemoryStore, Operation, StoreError, TreeEntry};

    fn blob(data: &[u8]) -> TreeEntry {
        TreeEntry::blob(hash_bytes(data))
    }

    #[test]
    fn test_identical_trees_emit_nothing() {
        let store = MemoryStore::new();
        let tree = store.tree_from_paths(&[("a/f", blob(b"f"))]);
        let seeds =
            walk_level(&store, tree, tree, tree, "", &CancelToken::new()).unwrap();
        assert!(seeds.is_empty());
    }

    #[test]
    fn test_unchanged_sibling_subtree_is_skipped() {
        let store = MemoryStore::new();
        let ancestor = store.tree_from_paths(&[("stable/f", blob(b"f")), ("g", blob(b"old"))]);
        let remote = store.tree_from_paths(&[("stable/f", blob(b"f")), ("g", blob(b"new"))]);

        let seeds =
            walk_level(&store, ancestor, ancestor, remote, "", &CancelToken::new()).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].location, "g");
        assert!(matches!(seeds[0].data, SeedData::Blob { .. }));
        assert_eq!(seeds[0].kind.direction, Direction::Incoming);
        assert_eq!(seeds[0].kind.operation, Operation::Modification);
    }

    #[test]
    fn test_changed_directory_becomes_tree_seed_without_recursion() {
        let store = MemoryStore::new();
        let ancestor = store.tree_from_paths(&[("dir/f", blob(b"old"))]);
        let remote = store.tree_from_paths(&[("dir/f", blob(b"new"))]);

        let seeds =
            walk_level(&store, ancestor, ancestor, remote, "", &CancelToken::new()).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].location, "dir");
        match &seeds[0].data {
            SeedData::Tree {
                ancestor: a,
                base: b,
                remote: r,
            } => {
                assert_eq!(a, b);
                assert_ne!(a, r);
                assert!(!r.is_zero());
            }
            other => panic!("expected tree seed, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_location_is_slash_joined() {
        let store = MemoryStore::new();
        let base = store.tree_from_paths(&[("f", blob(b"old"))]);
        let remote = store.tree_from_paths(&[("f", blob(b"new"))]);

        let seeds =
            walk_level(&store, base, base, remote, "dir/sub", &CancelToken::new()).unwrap();
        assert_eq!(seeds[0].location, "dir/sub/f");
    }

    #[test]
    fn test_file_replaced_by_directory_is_a_tree_seed() {
        let store = MemoryStore::new();
        let base = store.tree_from_paths(&[("x", blob(b"file"))]);
        let remote = store.tree_from_paths(&[("x/inner", blob(b"nested"))]);

        let seeds =
            walk_level(&store, base, base, remote, "", &CancelToken::new()).unwrap();
        assert_eq!(seeds.len(), 1);
        match &seeds[0].data {
            SeedData::Tree {
                ancestor,
                base,
                remote,
            } => {
                // File sides contribute no child tree
                assert!(ancestor.is_zero());
                assert!(base.is_zero());
                assert!(!remote.is_zero());
            }
            other => panic!("expected tree seed, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_tree_aborts_the_level() {
        let store = MemoryStore::new();
        let base = store.tree_from_paths(&[("f", blob(b"old"))]);
        let remote = store.tree_from_paths(&[("f", blob(b"new"))]);
        store.mark_corrupt(remote);

        let err = walk_level(&store, base, base, remote, "", &CancelToken::new()).unwrap_err();
        assert_eq!(err, ModelError::Store(StoreError::CorruptObject(remote)));
    }
}
