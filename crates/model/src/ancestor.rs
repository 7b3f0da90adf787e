//! Common-ancestor resolution for a commit's parent set

use crate::error::ModelResult;
use synctree_core::{CommitId, ObjectStore};

/// Resolve the nearest common ancestor of a commit's parents
///
/// This is the three-way-diff base reference point for the commit:
/// - no parents (root commit): `None`, the absent sentinel
/// - one parent: that parent itself: a single history start point has
///   nothing to merge with, so its walk trivially yields itself
/// - several parents (merge commit): the store's merge base across them
///
/// The result depends only on the commit's parent set, never on how the
/// caller reached the commit.
pub fn resolve_ancestor(
    store: &dyn ObjectStore,
    commit: CommitId,
) -> ModelResult<Option<CommitId>> {
    let meta = store.read_commit(commit)?;
    match meta.parents.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        parents => Ok(store.merge_base(parents)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synctree_core::id::hash_bytes;
    use synctree_core::{MemoryStore, TreeEntry};

    fn setup() -> (MemoryStore, CommitId) {
        let store = MemoryStore::new();
        let tree = store.tree_from_paths(&[("f", TreeEntry::blob(hash_bytes(b"f")))]);
        let root = store.commit(&[], tree, 1, "root");
        (store, root)
    }

    #[test]
    fn test_root_commit_has_no_ancestor() {
        let (store, root) = setup();
        assert_eq!(resolve_ancestor(&store, root).unwrap(), None);
    }

    #[test]
    fn test_single_parent_resolves_to_parent() {
        let (store, root) = setup();
        let tree = store.tree_from_paths(&[("f", TreeEntry::blob(hash_bytes(b"g")))]);
        let child = store.commit(&[root], tree, 2, "child");
        assert_eq!(resolve_ancestor(&store, child).unwrap(), Some(root));
    }

    #[test]
    fn test_merge_commit_resolves_to_merge_base() {
        let (store, root) = setup();
        let tree = store.tree_from_paths(&[("f", TreeEntry::blob(hash_bytes(b"g")))]);
        let left = store.commit(&[root], tree, 2, "left");
        let right = store.commit(&[root], tree, 3, "right");
        let merge = store.commit(&[left, right], tree, 4, "merge");
        assert_eq!(resolve_ancestor(&store, merge).unwrap(), Some(root));
    }

    #[test]
    fn test_merge_of_unrelated_histories_has_no_ancestor() {
        let (store, _) = setup();
        let tree = store.tree_from_paths(&[("f", TreeEntry::blob(hash_bytes(b"x")))]);
        let a = store.commit(&[], tree, 1, "a");
        let b = store.commit(&[], tree, 2, "b");
        let merge = store.commit(&[a, b], tree, 3, "merge");
        assert_eq!(resolve_ancestor(&store, merge).unwrap(), None);
    }
}
