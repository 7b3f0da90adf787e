//! The synchronization model: a lazily-materialized tree of typed nodes
//!
//! One root per repository, one child per partitioned commit (plus the
//! optional index/working-copy pseudo-commits), directories and files below
//! each commit. Nothing below a node is touched until its `children` are
//! first requested; the result is memoized, so re-asking never re-walks the
//! store.

use crate::ancestor::resolve_ancestor;
use crate::cancel::CancelToken;
use crate::error::ModelResult;
use crate::flat::{build_forest, FlatData, FlatForest, FlatIndex};
use crate::kind::{classify, ChangeKind, Direction};
use crate::node::{
    CommitPayload, ContentIds, Node, NodeData, NodeId, NodeType, RepositoryData,
};
use crate::partition::partition;
use crate::walk::{walk_level, NodeSeed, SeedData};
use std::sync::Arc;
use synctree_core::{ChangeSource, CommitId, ObjectId, ObjectStore, Operation};
use tracing::debug;

/// What to synchronize
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Revision name of the local endpoint
    pub local: String,
    /// Revision name of the remote endpoint
    pub remote: String,
    /// Also expose the index and working copy as pseudo-commits
    pub include_working_state: bool,
}

/// A built synchronization model
///
/// Single-threaded: materialization happens on the calling thread and the
/// memoized results are cached without synchronization. The underlying
/// store is shared read-only, so any number of `SyncModel` instances may be
/// built over it concurrently, but one instance must not be shared across
/// threads without an external lock.
pub struct SyncModel {
    store: Arc<dyn ObjectStore>,
    cancel: CancelToken,
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyncModel {
    /// Resolve both endpoints and create the repository root
    ///
    /// No history is walked here; the first `children` call on the root
    /// triggers the partition.
    pub fn build(
        store: Arc<dyn ObjectStore>,
        options: SyncOptions,
        cancel: CancelToken,
    ) -> ModelResult<Self> {
        let local_tip = store.resolve_revision(&options.local)?;
        let remote_tip = store.resolve_revision(&options.remote)?;
        debug!(%local_tip, %remote_tip, "building synchronization model");

        let root = Node {
            parent: None,
            location: String::new(),
            kind: None,
            children: None,
            data: NodeData::Repository(RepositoryData {
                local_tip,
                remote_tip,
                include_working_state: options.include_working_state,
            }),
        };

        Ok(Self {
            store,
            cancel,
            nodes: vec![root],
            root: NodeId(0),
        })
    }

    /// The repository root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Variant of a node
    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.nodes[id.0].node_type()
    }

    /// Repository-relative path of a node (empty above directory level)
    pub fn location(&self, id: NodeId) -> &str {
        &self.nodes[id.0].location
    }

    /// Non-owning back-reference to the enclosing node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Commit metadata, for commit nodes only
    pub fn commit_payload(&self, id: NodeId) -> Option<&CommitPayload> {
        match &self.nodes[id.0].data {
            NodeData::Commit(payload) => Some(payload),
            _ => None,
        }
    }

    /// The three content ids of a tree or blob node
    pub fn content_ids(&self, id: NodeId) -> Option<ContentIds> {
        match &self.nodes[id.0].data {
            NodeData::Tree(ids) | NodeData::Blob(ids) => Some(*ids),
            _ => None,
        }
    }

    /// Display label: commit summary, pseudo-commit source, or entry name
    pub fn label(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        match &node.data {
            NodeData::Repository(_) => "repository".to_string(),
            NodeData::Commit(CommitPayload::Revision { summary, .. }) => summary.clone(),
            NodeData::Commit(CommitPayload::Flat { source }) => source.label().to_string(),
            NodeData::Tree(_) | NodeData::Blob(_) => node
                .location
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Whether a node's children have already been materialized
    pub fn is_materialized(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_some()
    }

    /// Children of a node, materializing them on first access
    ///
    /// The result is memoized: a second call returns the same list without
    /// touching the store. A store error or cancellation aborts only this
    /// node's materialization: the arena is left unchanged, siblings stay
    /// valid, and the call can be retried.
    pub fn children(&mut self, id: NodeId) -> ModelResult<Vec<NodeId>> {
        if let Some(children) = &self.nodes[id.0].children {
            return Ok(children.clone());
        }

        let children = match self.nodes[id.0].data.clone() {
            NodeData::Repository(repo) => self.materialize_repository(id, repo)?,
            NodeData::Commit(CommitPayload::Revision {
                remote,
                base,
                ancestor,
                ..
            }) => self.materialize_commit(id, remote, base, ancestor)?,
            NodeData::Commit(CommitPayload::Flat { source }) => {
                self.materialize_flat(id, source)?
            }
            NodeData::Tree(ids) => {
                let location = self.nodes[id.0].location.clone();
                let seeds = walk_level(
                    self.store.as_ref(),
                    ids.ancestor,
                    ids.base,
                    ids.remote,
                    &location,
                    &self.cancel,
                )?;
                self.push_seeds(id, seeds)
            }
            NodeData::Blob(_) => Vec::new(),
        };

        self.nodes[id.0].children = Some(children.clone());
        Ok(children)
    }

    /// Classification of a node, computed lazily and cached
    pub fn kind(&mut self, id: NodeId) -> ModelResult<ChangeKind> {
        if let Some(kind) = self.nodes[id.0].kind {
            return Ok(kind);
        }

        let kind = match self.nodes[id.0].data.clone() {
            NodeData::Repository(_) => {
                // A container reports its children's shared direction, or
                // conflicting when they disagree
                let children = self.children(id)?;
                let mut direction: Option<Direction> = None;
                for child in children {
                    let child_direction = self.kind(child)?.direction;
                    match direction {
                        None => direction = Some(child_direction),
                        Some(prev) if prev == child_direction => {}
                        Some(_) => {
                            direction = Some(Direction::Conflicting);
                            break;
                        }
                    }
                }
                ChangeKind::new(
                    direction.unwrap_or(Direction::Incoming),
                    Operation::Modification,
                )
            }
            NodeData::Commit(CommitPayload::Revision { base, ancestor, .. }) => {
                // Commit-level direction only distinguishes "first-parent
                // history" from "divergent merge": the ancestor is compared
                // against the base, and anything else reports conflicting.
                // Per-entry nodes below carry the precise direction.
                let direction = if ancestor == base {
                    Direction::Incoming
                } else {
                    Direction::Conflicting
                };
                let operation = if base.is_none() {
                    Operation::Addition
                } else {
                    Operation::Modification
                };
                ChangeKind::new(direction, operation)
            }
            NodeData::Commit(CommitPayload::Flat { .. }) => {
                // Local edits can never be incoming
                ChangeKind::new(Direction::Outgoing, Operation::Modification)
            }
            NodeData::Tree(ids) | NodeData::Blob(ids) => {
                classify(ids.ancestor, ids.base, ids.remote)
            }
        };

        self.nodes[id.0].kind = Some(kind);
        Ok(kind)
    }

    fn materialize_repository(
        &mut self,
        id: NodeId,
        repo: RepositoryData,
    ) -> ModelResult<Vec<NodeId>> {
        let part = partition(
            self.store.as_ref(),
            repo.local_tip,
            repo.remote_tip,
            &self.cancel,
        )?;

        let sided = part
            .local_only
            .iter()
            .map(|&commit| (commit, Direction::Outgoing))
            .chain(
                part.remote_only
                    .iter()
                    .map(|&commit| (commit, Direction::Incoming)),
            );

        // Assemble every record before touching the arena so a failing
        // store read leaves the root unmaterialized
        let mut records = Vec::new();
        for (commit, side) in sided {
            self.cancel.check()?;
            let meta = self.store.read_commit(commit)?;
            let ancestor = resolve_ancestor(self.store.as_ref(), commit)?;
            records.push(Node {
                parent: Some(id),
                location: String::new(),
                kind: None,
                children: None,
                data: NodeData::Commit(CommitPayload::Revision {
                    remote: commit,
                    base: meta.parents.first().copied(),
                    ancestor,
                    side,
                    summary: meta.summary,
                    timestamp_ms: meta.timestamp_ms,
                }),
            });
        }

        if repo.include_working_state {
            for source in [ChangeSource::Index, ChangeSource::WorkingCopy] {
                records.push(Node {
                    parent: Some(id),
                    location: String::new(),
                    kind: None,
                    children: None,
                    data: NodeData::Commit(CommitPayload::Flat { source }),
                });
            }
        }

        Ok(records
            .into_iter()
            .map(|record| self.push_node(record))
            .collect())
    }

    fn materialize_commit(
        &mut self,
        id: NodeId,
        remote: CommitId,
        base: Option<CommitId>,
        ancestor: Option<CommitId>,
    ) -> ModelResult<Vec<NodeId>> {
        let tree_of = |commit: Option<CommitId>| -> ModelResult<ObjectId> {
            match commit {
                Some(commit) => Ok(self.store.read_commit(commit)?.tree),
                None => Ok(ObjectId::ZERO),
            }
        };

        let ancestor_tree = tree_of(ancestor)?;
        let base_tree = tree_of(base)?;
        let remote_tree = self.store.read_commit(remote)?.tree;

        let seeds = walk_level(
            self.store.as_ref(),
            ancestor_tree,
            base_tree,
            remote_tree,
            "",
            &self.cancel,
        )?;
        Ok(self.push_seeds(id, seeds))
    }

    fn materialize_flat(&mut self, id: NodeId, source: ChangeSource) -> ModelResult<Vec<NodeId>> {
        let changes = self.store.flat_changes(source)?;
        let forest = build_forest(&changes, &self.cancel)?;

        let mut children = Vec::with_capacity(forest.roots.len());
        for &root in &forest.roots {
            children.push(self.import_flat(id, &forest, root));
        }
        Ok(children)
    }

    /// Copy a reconstructed flat node (and its subtree) into the arena
    ///
    /// Flat subtrees arrive fully built, so their child lists are sealed
    /// immediately; they are the one place nodes are born materialized.
    fn import_flat(&mut self, parent: NodeId, forest: &FlatForest, index: FlatIndex) -> NodeId {
        let flat = &forest.nodes[index];
        let data = match flat.data {
            FlatData::Tree => NodeData::Tree(ContentIds {
                ancestor: ObjectId::ZERO,
                base: ObjectId::ZERO,
                remote: ObjectId::ZERO,
            }),
            // Local edits: the working side is "base", the last committed
            // content stands in for both ancestor and remote
            FlatData::Blob { old_id, new_id } => NodeData::Blob(ContentIds {
                ancestor: old_id,
                base: new_id,
                remote: old_id,
            }),
        };

        let node_id = self.push_node(Node {
            parent: Some(parent),
            location: flat.location.clone(),
            kind: Some(flat.kind),
            children: None,
            data,
        });

        let children: Vec<NodeId> = flat
            .children
            .iter()
            .map(|&child| self.import_flat(node_id, forest, child))
            .collect();
        self.nodes[node_id.0].children = Some(children);
        node_id
    }

    fn push_seeds(&mut self, parent: NodeId, seeds: Vec<NodeSeed>) -> Vec<NodeId> {
        seeds
            .into_iter()
            .map(|seed| {
                let data = match seed.data {
                    SeedData::Tree {
                        ancestor,
                        base,
                        remote,
                    } => NodeData::Tree(ContentIds {
                        ancestor,
                        base,
                        remote,
                    }),
                    SeedData::Blob {
                        ancestor,
                        base,
                        remote,
                    } => NodeData::Blob(ContentIds {
                        ancestor,
                        base,
                        remote,
                    }),
                };
                self.push_node(Node {
                    parent: Some(parent),
                    location: seed.location,
                    kind: Some(seed.kind),
                    children: None,
                    data,
                })
            })
            .collect()
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}
