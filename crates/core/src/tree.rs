//! Tree objects: one directory level of a repository snapshot

use crate::id::{hash_bytes, ObjectId, TreeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// A nested directory, pointing at another tree object
    Tree,
    /// A regular file, pointing at a blob object
    Blob,
    /// A symbolic link, pointing at a blob holding the target path
    Symlink,
}

impl EntryKind {
    /// Whether this entry references a tree object
    pub fn is_tree(&self) -> bool {
        matches!(self, EntryKind::Tree)
    }
}

/// One named entry inside a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Kind of object the entry points at
    pub kind: EntryKind,
    /// Id of the referenced tree or blob
    pub id: ObjectId,
}

impl TreeEntry {
    /// Create a file entry
    pub fn blob(id: ObjectId) -> Self {
        Self {
            kind: EntryKind::Blob,
            id,
        }
    }

    /// Create a nested-directory entry
    pub fn tree(id: TreeId) -> Self {
        Self {
            kind: EntryKind::Tree,
            id,
        }
    }
}

/// A single directory level, mapping entry names to entries
///
/// Entries are kept sorted by name so serialization (and therefore the
/// tree's own id) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any existing entry with the same name
    pub fn insert(&mut self, name: impl Into<String>, entry: TreeEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Look up an entry by name
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TreeEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Compute this tree's content id
    ///
    /// Hashes a deterministic byte encoding: for each entry in name order,
    /// `name_len: u16 | name | kind: u8 | id: [u8; 32]`.
    pub fn id(&self) -> TreeId {
        let mut buf = Vec::with_capacity(self.entries.len() * 48);
        buf.extend_from_slice(b"STT1");
        for (name, entry) in &self.entries {
            buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
            buf.extend_from_slice(name.as_bytes());
            buf.push(match entry.kind {
                EntryKind::Tree => 0,
                EntryKind::Blob => 1,
                EntryKind::Symlink => 2,
            });
            buf.extend_from_slice(entry.id.as_bytes());
        }
        hash_bytes(&buf)
    }
}

impl FromIterator<(String, TreeEntry)> for Tree {
    fn from_iter<I: IntoIterator<Item = (String, TreeEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::hash_bytes;

    #[test]
    fn test_tree_id_deterministic() {
        let mut a = Tree::new();
        a.insert("b.txt", TreeEntry::blob(hash_bytes(b"b")));
        a.insert("a.txt", TreeEntry::blob(hash_bytes(b"a")));

        let mut b = Tree::new();
        b.insert("a.txt", TreeEntry::blob(hash_bytes(b"a")));
        b.insert("b.txt", TreeEntry::blob(hash_bytes(b"b")));

        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_tree_id_sensitive_to_content() {
        let mut a = Tree::new();
        a.insert("f", TreeEntry::blob(hash_bytes(b"one")));
        let mut b = Tree::new();
        b.insert("f", TreeEntry::blob(hash_bytes(b"two")));
        assert_ne!(a.id(), b.id());

        // Same id under a different kind is still a different tree
        let mut c = Tree::new();
        c.insert("f", TreeEntry::tree(hash_bytes(b"one")));
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.id(), Tree::new().id());
    }
}
