//! Change classification: direction and operation of a changed path

use serde::{Deserialize, Serialize};
use synctree_core::{ObjectId, Operation};

/// Which endpoint a change belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Only the remote side changed relative to the common ancestor
    Incoming,
    /// Only the local side changed relative to the common ancestor
    Outgoing,
    /// Both sides diverged from the common ancestor
    Conflicting,
}

/// Full classification of a changed path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeKind {
    /// Incoming, outgoing, or conflicting
    pub direction: Direction,
    /// Addition, deletion, or modification
    pub operation: Operation,
}

impl ChangeKind {
    /// Pair a direction with an operation
    pub fn new(direction: Direction, operation: Operation) -> Self {
        Self {
            direction,
            operation,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}|{:?}", self.direction, self.operation)
    }
}

/// Classify a changed path from its three content ids
///
/// Direction compares the ancestor id against the local ("base") and remote
/// ids: unchanged locally means the change came in from the remote side,
/// unchanged remotely means it is a local edit, anything else diverged.
/// Operation looks only at which side is absent. Callers only classify
/// entries the store reported as differing, so at least one comparison
/// below holds.
pub fn classify(ancestor: ObjectId, base: ObjectId, remote: ObjectId) -> ChangeKind {
    let direction = if ancestor == base && ancestor != remote {
        Direction::Incoming
    } else if ancestor == remote && ancestor != base {
        Direction::Outgoing
    } else {
        Direction::Conflicting
    };

    let operation = if base.is_zero() {
        Operation::Addition
    } else if remote.is_zero() {
        Operation::Deletion
    } else {
        Operation::Modification
    };

    ChangeKind::new(direction, operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synctree_core::id::hash_bytes;

    fn id(data: &[u8]) -> ObjectId {
        hash_bytes(data)
    }

    #[test]
    fn test_incoming_modification() {
        let kind = classify(id(b"v1"), id(b"v1"), id(b"v2"));
        assert_eq!(kind.direction, Direction::Incoming);
        assert_eq!(kind.operation, Operation::Modification);
    }

    #[test]
    fn test_outgoing_modification() {
        let kind = classify(id(b"v1"), id(b"v2"), id(b"v1"));
        assert_eq!(kind.direction, Direction::Outgoing);
        assert_eq!(kind.operation, Operation::Modification);
    }

    #[test]
    fn test_conflicting_when_all_distinct() {
        let kind = classify(id(b"v1"), id(b"v2"), id(b"v3"));
        assert_eq!(kind.direction, Direction::Conflicting);
        assert_eq!(kind.operation, Operation::Modification);
    }

    #[test]
    fn test_conflicting_when_both_sides_made_same_change() {
        // Both endpoints changed away from the ancestor, even if identically
        let kind = classify(id(b"v1"), id(b"v2"), id(b"v2"));
        assert_eq!(kind.direction, Direction::Conflicting);
    }

    #[test]
    fn test_incoming_addition() {
        let kind = classify(ObjectId::ZERO, ObjectId::ZERO, id(b"new"));
        assert_eq!(kind.direction, Direction::Incoming);
        assert_eq!(kind.operation, Operation::Addition);
    }

    #[test]
    fn test_incoming_deletion() {
        let kind = classify(id(b"old"), id(b"old"), ObjectId::ZERO);
        assert_eq!(kind.direction, Direction::Incoming);
        assert_eq!(kind.operation, Operation::Deletion);
    }
}
