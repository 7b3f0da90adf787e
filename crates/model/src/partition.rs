//! Commit-graph partitioning between two tips

use crate::cancel::CancelToken;
use crate::error::ModelResult;
use ahash::{AHashMap, AHashSet};
use std::collections::BinaryHeap;
use synctree_core::{CommitId, CommitMeta, ObjectStore};
use tracing::debug;

const LOCAL: u8 = 0b01;
const REMOTE: u8 = 0b10;

/// Result of splitting the history reachable from two tips
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Commits reachable only from the local tip, newest first
    pub local_only: Vec<CommitId>,
    /// Commits reachable only from the remote tip, newest first
    pub remote_only: Vec<CommitId>,
    /// The commit the walk stopped at, reachable from both tips
    ///
    /// `None` when the two histories share no commit at all.
    pub common_ancestor: Option<CommitId>,
}

/// Split the commits reachable from `local_tip` and `remote_tip` into
/// "only local" and "only remote" sets
///
/// A single combined walk starts from both tips at once. Every commit is
/// tagged with the tip(s) it was reached from and classified in
/// reverse-chronological order; the first classified commit carrying both
/// tags is the merge base of the whole partition: nothing below it can be
/// exclusive to either side, so the walk stops there. If the histories are
/// unrelated the walk exhausts itself and both sets are complete.
///
/// Commits sharing a timestamp are taken as one batch, closed over their
/// same-timestamp parents and ordered topologically within the batch, so a
/// parent is never classified before a child that would tag it even when a
/// whole chain was committed in the same millisecond. Each commit header is
/// read at most once no matter how many paths reach the commit.
pub fn partition(
    store: &dyn ObjectStore,
    local_tip: CommitId,
    remote_tip: CommitId,
    cancel: &CancelToken,
) -> ModelResult<Partition> {
    let mut result = Partition::default();

    // commit id -> accumulated reachability tags
    let mut tags: AHashMap<CommitId, u8> = AHashMap::new();
    // max-heap on (timestamp, id): pops newest first
    let mut queue: BinaryHeap<(u64, CommitId)> = BinaryHeap::new();
    // commit headers, each read from the store once and kept for the walk
    let mut metas: AHashMap<CommitId, CommitMeta> = AHashMap::new();

    let enqueue = |id: CommitId,
                   tag: u8,
                   tags: &mut AHashMap<CommitId, u8>,
                   queue: &mut BinaryHeap<(u64, CommitId)>,
                   metas: &mut AHashMap<CommitId, CommitMeta>|
     -> ModelResult<()> {
        let entry = tags.entry(id).or_insert(0);
        let first_reach = *entry == 0;
        *entry |= tag;
        if first_reach {
            let timestamp = match metas.get(&id) {
                Some(meta) => meta.timestamp_ms,
                None => {
                    let meta = store.read_commit(id)?;
                    let timestamp = meta.timestamp_ms;
                    metas.insert(id, meta);
                    timestamp
                }
            };
            queue.push((timestamp, id));
        }
        Ok(())
    };

    enqueue(local_tip, LOCAL, &mut tags, &mut queue, &mut metas)?;
    enqueue(remote_tip, REMOTE, &mut tags, &mut queue, &mut metas)?;

    'walk: while let Some(&(batch_ts, _)) = queue.peek() {
        // Pull every queued commit sharing the newest timestamp
        let mut batch: Vec<CommitId> = Vec::new();
        while let Some(&(ts, id)) = queue.peek() {
            if ts != batch_ts {
                break;
            }
            queue.pop();
            batch.push(id);
        }
        let mut batch_set: AHashSet<CommitId> = batch.iter().copied().collect();

        // Close the batch over same-timestamp parents and count, per
        // parent, the in-batch children that must classify before it
        let mut blocking: AHashMap<CommitId, usize> = AHashMap::new();
        let mut scan = 0;
        while scan < batch.len() {
            cancel.check()?;
            let id = batch[scan];
            scan += 1;

            let parents = match metas.get(&id) {
                Some(meta) => meta.parents.clone(),
                None => {
                    let meta = store.read_commit(id)?;
                    let parents = meta.parents.clone();
                    metas.insert(id, meta);
                    parents
                }
            };
            for parent in parents {
                let parent_ts = match metas.get(&parent) {
                    Some(meta) => meta.timestamp_ms,
                    None => {
                        let meta = store.read_commit(parent)?;
                        let timestamp = meta.timestamp_ms;
                        metas.insert(parent, meta);
                        timestamp
                    }
                };
                if parent_ts != batch_ts {
                    continue;
                }
                if batch_set.insert(parent) {
                    batch.push(parent);
                }
                *blocking.entry(parent).or_insert(0) += 1;
            }
        }

        // Classify unblocked commits first; the first both-tagged commit
        // seals the batch once every exclusive member has been listed
        let mut common: Option<CommitId> = None;
        let mut ready: Vec<CommitId> = Vec::new();
        for &id in &batch {
            if blocking.contains_key(&id) {
                continue;
            }
            if tags[&id] == LOCAL | REMOTE {
                common.get_or_insert(id);
            } else {
                ready.push(id);
            }
        }

        while let Some(id) = ready.pop() {
            cancel.check()?;
            let tag = tags[&id];

            if tag == LOCAL {
                result.local_only.push(id);
            } else {
                result.remote_only.push(id);
            }

            let parents = match metas.get(&id) {
                Some(meta) => meta.parents.clone(),
                None => store.read_commit(id)?.parents,
            };
            for parent in parents {
                if batch_set.contains(&parent) {
                    *tags.entry(parent).or_insert(0) |= tag;
                    if let Some(count) = blocking.get_mut(&parent) {
                        *count -= 1;
                        if *count == 0 {
                            blocking.remove(&parent);
                            if tags[&parent] == LOCAL | REMOTE {
                                common.get_or_insert(parent);
                            } else {
                                ready.push(parent);
                            }
                        }
                    }
                } else {
                    enqueue(parent, tag, &mut tags, &mut queue, &mut metas)?;
                }
            }
        }

        if let Some(id) = common {
            result.common_ancestor = Some(id);
            break 'walk;
        }
    }

    debug!(
        local_only = result.local_only.len(),
        remote_only = result.remote_only.len(),
        stopped_at_common = result.common_ancestor.is_some(),
        "partitioned commit graph"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use synctree_core::id::hash_bytes;
    use synctree_core::{MemoryStore, TreeEntry, TreeId};

    fn tree(store: &MemoryStore, marker: &[u8]) -> TreeId {
        store.tree_from_paths(&[("f", TreeEntry::blob(hash_bytes(marker)))])
    }

    #[test]
    fn test_diverged_branches() {
        let store = MemoryStore::new();
        let r0 = store.commit(&[], tree(&store, b"0"), 10, "r0");
        let l1 = store.commit(&[r0], tree(&store, b"l"), 20, "l1");
        let r1 = store.commit(&[r0], tree(&store, b"r"), 30, "r1");

        let part = partition(&store, l1, r1, &CancelToken::new()).unwrap();
        assert_eq!(part.local_only, vec![l1]);
        assert_eq!(part.remote_only, vec![r1]);
        assert_eq!(part.common_ancestor, Some(r0));
    }

    #[test]
    fn test_fast_forward_has_no_local_side() {
        let store = MemoryStore::new();
        let l1 = store.commit(&[], tree(&store, b"0"), 10, "l1");
        let r1 = store.commit(&[l1], tree(&store, b"r"), 20, "r1");

        let part = partition(&store, l1, r1, &CancelToken::new()).unwrap();
        assert!(part.local_only.is_empty());
        assert_eq!(part.remote_only, vec![r1]);
        assert_eq!(part.common_ancestor, Some(l1));
    }

    #[test]
    fn test_fast_forward_with_equal_timestamps() {
        // Same-millisecond parent and child must still partition cleanly
        let store = MemoryStore::new();
        let l1 = store.commit(&[], tree(&store, b"0"), 10, "l1");
        let r1 = store.commit(&[l1], tree(&store, b"r"), 10, "r1");

        let part = partition(&store, l1, r1, &CancelToken::new()).unwrap();
        assert!(part.local_only.is_empty());
        assert_eq!(part.remote_only, vec![r1]);
        assert_eq!(part.common_ancestor, Some(l1));
    }

    #[test]
    fn test_equal_timestamp_chain_orders_topologically() {
        // A whole chain committed in one millisecond: children must
        // classify before their parents regardless of id order
        let store = MemoryStore::new();
        let l1 = store.commit(&[], tree(&store, b"0"), 10, "l1");
        let y = store.commit(&[l1], tree(&store, b"y"), 10, "y");
        let r1 = store.commit(&[y], tree(&store, b"r"), 10, "r1");

        let part = partition(&store, l1, r1, &CancelToken::new()).unwrap();
        assert!(part.local_only.is_empty());
        assert_eq!(part.remote_only, vec![r1, y]);
        assert_eq!(part.common_ancestor, Some(l1));
    }

    #[test]
    fn test_equal_timestamp_divergence() {
        let store = MemoryStore::new();
        let r0 = store.commit(&[], tree(&store, b"0"), 10, "r0");
        let l1 = store.commit(&[r0], tree(&store, b"l"), 10, "l1");
        let r1 = store.commit(&[r0], tree(&store, b"r"), 10, "r1");

        let part = partition(&store, l1, r1, &CancelToken::new()).unwrap();
        assert_eq!(part.local_only, vec![l1]);
        assert_eq!(part.remote_only, vec![r1]);
        assert_eq!(part.common_ancestor, Some(r0));
    }

    #[test]
    fn test_identical_tips_are_fully_common() {
        let store = MemoryStore::new();
        let c = store.commit(&[], tree(&store, b"0"), 10, "c");

        let part = partition(&store, c, c, &CancelToken::new()).unwrap();
        assert!(part.local_only.is_empty());
        assert!(part.remote_only.is_empty());
        assert_eq!(part.common_ancestor, Some(c));
    }

    #[test]
    fn test_unrelated_histories_return_full_reachable_sets() {
        let store = MemoryStore::new();
        let a0 = store.commit(&[], tree(&store, b"a0"), 10, "a0");
        let a1 = store.commit(&[a0], tree(&store, b"a1"), 20, "a1");
        let b0 = store.commit(&[], tree(&store, b"b0"), 15, "b0");

        let part = partition(&store, a1, b0, &CancelToken::new()).unwrap();
        assert_eq!(part.local_only, vec![a1, a0]);
        assert_eq!(part.remote_only, vec![b0]);
        assert_eq!(part.common_ancestor, None);
    }

    #[test]
    fn test_diamond_is_visited_once() {
        // r0 <- a <- m and r0 <- b <- m: two paths reach r0 from the merge
        let store = MemoryStore::new();
        let r0 = store.commit(&[], tree(&store, b"0"), 10, "r0");
        let a = store.commit(&[r0], tree(&store, b"a"), 20, "a");
        let b = store.commit(&[r0], tree(&store, b"b"), 30, "b");
        let m = store.commit(&[a, b], tree(&store, b"m"), 40, "m");
        let remote = store.commit(&[r0], tree(&store, b"x"), 25, "remote");

        let part = partition(&store, m, remote, &CancelToken::new()).unwrap();
        // Newest-first classification order: m(40), b(30), a(20)
        assert_eq!(part.local_only, vec![m, b, a]);
        assert_eq!(part.remote_only, vec![remote]);
        assert_eq!(part.common_ancestor, Some(r0));
    }

    #[test]
    fn test_deep_history_stops_at_merge_base() {
        // Commits below the merge base must never be classified
        let store = MemoryStore::new();
        let mut tip = store.commit(&[], tree(&store, b"base"), 1, "deep");
        for i in 0..50u64 {
            tip = store.commit(&[tip], tree(&store, &i.to_le_bytes()), 2 + i, "chain");
        }
        let l = store.commit(&[tip], tree(&store, b"l"), 100, "l");
        let r = store.commit(&[tip], tree(&store, b"r"), 101, "r");

        let part = partition(&store, l, r, &CancelToken::new()).unwrap();
        assert_eq!(part.local_only, vec![l]);
        assert_eq!(part.remote_only, vec![r]);
        assert_eq!(part.common_ancestor, Some(tip));
    }

    #[test]
    fn test_cancellation_surfaces_distinctly() {
        let store = MemoryStore::new();
        let r0 = store.commit(&[], tree(&store, b"0"), 10, "r0");
        let l1 = store.commit(&[r0], tree(&store, b"l"), 20, "l1");

        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            partition(&store, l1, r0, &cancel),
            Err(ModelError::Cancelled)
        );
    }
}
