//! In-memory reference implementation of [`ObjectStore`]
//!
//! Used by the test suites and by embedders that assemble synthetic
//! histories. Supports fault injection (corrupt objects, an unavailable
//! store) so error paths can be exercised without a real repository.

use crate::id::{hash_bytes, CommitId, ObjectId, TreeId};
use crate::store::{
    Change, ChangeSource, CommitMeta, ObjectStore, SideEntry, StoreError, StoreResult,
    ThreeWayEntry,
};
use crate::tree::{Tree, TreeEntry};
use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Default)]
struct StoreInner {
    commits: AHashMap<CommitId, CommitMeta>,
    trees: AHashMap<TreeId, Tree>,
    refs: AHashMap<String, CommitId>,
    index_changes: Vec<Change>,
    working_changes: Vec<Change>,
    corrupt: AHashSet<ObjectId>,
    unavailable: bool,
}

/// An in-memory object store
///
/// All state lives behind a single `RwLock`, so a populated store can be
/// shared read-only across any number of concurrent model builders.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a tree object and return its id
    pub fn add_tree(&self, tree: Tree) -> TreeId {
        let id = tree.id();
        self.inner.write().trees.insert(id, tree);
        id
    }

    /// Build and store the nested trees for a flat set of `(path, entry)`
    /// leaves, returning the root tree id
    ///
    /// Intermediate directory trees are created and stored as needed, so a
    /// whole snapshot can be described by its leaf paths alone.
    pub fn tree_from_paths(&self, leaves: &[(&str, TreeEntry)]) -> TreeId {
        #[derive(Default)]
        struct DirLevel {
            files: BTreeMap<String, TreeEntry>,
            dirs: BTreeMap<String, DirLevel>,
        }

        let mut root = DirLevel::default();
        for (path, entry) in leaves {
            let mut level = &mut root;
            let mut segments = path.split('/').peekable();
            while let Some(segment) = segments.next() {
                if segments.peek().is_some() {
                    level = level.dirs.entry(segment.to_string()).or_default();
                } else {
                    level.files.insert(segment.to_string(), *entry);
                }
            }
        }

        fn store_level(store: &MemoryStore, level: DirLevel) -> TreeId {
            let mut tree = Tree::new();
            for (name, sub) in level.dirs {
                let sub_id = store_level(store, sub);
                tree.insert(name, TreeEntry::tree(sub_id));
            }
            for (name, entry) in level.files {
                tree.insert(name, entry);
            }
            store.add_tree(tree)
        }

        store_level(self, root)
    }

    /// Store a commit and return its id
    pub fn commit(
        &self,
        parents: &[CommitId],
        tree: TreeId,
        timestamp_ms: u64,
        summary: &str,
    ) -> CommitId {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"STC1");
        for parent in parents {
            buf.extend_from_slice(parent.as_bytes());
        }
        buf.extend_from_slice(tree.as_bytes());
        buf.extend_from_slice(&timestamp_ms.to_le_bytes());
        buf.extend_from_slice(summary.as_bytes());
        let id = hash_bytes(&buf);

        let meta = CommitMeta {
            parents: SmallVec::from_slice(parents),
            tree,
            timestamp_ms,
            summary: summary.to_string(),
        };
        self.inner.write().commits.insert(id, meta);
        id
    }

    /// Point a revision name at a commit
    pub fn set_ref(&self, name: impl Into<String>, id: CommitId) {
        self.inner.write().refs.insert(name.into(), id);
    }

    /// Replace the flat change list reported for a source
    pub fn set_flat_changes(&self, source: ChangeSource, changes: Vec<Change>) {
        let mut inner = self.inner.write();
        match source {
            ChangeSource::Index => inner.index_changes = changes,
            ChangeSource::WorkingCopy => inner.working_changes = changes,
        }
    }

    /// Make reads of the given object fail with [`StoreError::CorruptObject`]
    pub fn mark_corrupt(&self, id: ObjectId) {
        self.inner.write().corrupt.insert(id);
    }

    /// Make every operation fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.write().unavailable = unavailable;
    }

    fn check_available(inner: &StoreInner) -> StoreResult<()> {
        if inner.unavailable {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }

    fn load_tree(inner: &StoreInner, id: Option<TreeId>) -> StoreResult<Tree> {
        let Some(id) = id.filter(|id| !id.is_zero()) else {
            return Ok(Tree::new());
        };
        if inner.corrupt.contains(&id) {
            return Err(StoreError::CorruptObject(id));
        }
        inner
            .trees
            .get(&id)
            .cloned()
            .ok_or(StoreError::CorruptObject(id))
    }
}

impl ObjectStore for MemoryStore {
    fn resolve_revision(&self, name: &str) -> StoreResult<CommitId> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        if let Some(&id) = inner.refs.get(name) {
            return Ok(id);
        }
        if let Ok(id) = ObjectId::from_hex(name) {
            if inner.commits.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(StoreError::UnknownRevision(name.to_string()))
    }

    fn read_commit(&self, id: CommitId) -> StoreResult<CommitMeta> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        if inner.corrupt.contains(&id) {
            return Err(StoreError::CorruptObject(id));
        }
        inner
            .commits
            .get(&id)
            .cloned()
            .ok_or(StoreError::CorruptObject(id))
    }

    fn merge_base(&self, heads: &[CommitId]) -> StoreResult<Option<CommitId>> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;

        let mut common: Option<AHashSet<CommitId>> = None;
        for &head in heads {
            // Reachable set of this head, head included
            let mut reachable = AHashSet::new();
            let mut queue = VecDeque::from([head]);
            while let Some(id) = queue.pop_front() {
                if !reachable.insert(id) {
                    continue;
                }
                if let Some(meta) = inner.commits.get(&id) {
                    queue.extend(meta.parents.iter().copied());
                }
            }
            common = Some(match common {
                None => reachable,
                Some(prev) => prev.intersection(&reachable).copied().collect(),
            });
        }

        let common = common.unwrap_or_default();
        let best = common
            .into_iter()
            .filter_map(|id| inner.commits.get(&id).map(|meta| (meta.timestamp_ms, id)))
            .max();
        Ok(best.map(|(_, id)| id))
    }

    fn read_tree(&self, id: TreeId) -> StoreResult<Tree> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        Self::load_tree(&inner, Some(id))
    }

    fn diff_trees(
        &self,
        ancestor: Option<TreeId>,
        base: Option<TreeId>,
        remote: Option<TreeId>,
    ) -> StoreResult<Vec<ThreeWayEntry>> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;

        let ancestor_tree = Self::load_tree(&inner, ancestor)?;
        let base_tree = Self::load_tree(&inner, base)?;
        let remote_tree = Self::load_tree(&inner, remote)?;

        let names: BTreeSet<&str> = ancestor_tree
            .iter()
            .chain(base_tree.iter())
            .chain(remote_tree.iter())
            .map(|(name, _)| name)
            .collect();

        let side = |tree: &Tree, name: &str| {
            tree.get(name)
                .map(|entry| SideEntry::present(entry.kind, entry.id))
                .unwrap_or(SideEntry::ABSENT)
        };

        let mut entries = Vec::new();
        for name in names {
            let a = side(&ancestor_tree, name);
            let b = side(&base_tree, name);
            let r = side(&remote_tree, name);
            if a == b && b == r {
                continue;
            }
            entries.push(ThreeWayEntry {
                name: name.to_string(),
                ancestor: a,
                base: b,
                remote: r,
            });
        }
        Ok(entries)
    }

    fn flat_changes(&self, source: ChangeSource) -> StoreResult<Vec<Change>> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        Ok(match source {
            ChangeSource::Index => inner.index_changes.clone(),
            ChangeSource::WorkingCopy => inner.working_changes.clone(),
        })
    }
}
