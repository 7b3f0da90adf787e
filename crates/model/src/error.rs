//! Model error taxonomy

use synctree_core::StoreError;
use thiserror::Error;

/// Errors surfaced while building or expanding the model
///
/// Store errors abort only the subtree being built; siblings that were
/// already materialized stay valid. Cancellation is reported distinctly so
/// callers can tell an aborted walk from a broken store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The object store failed underneath us
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The caller requested an abort mid-walk
    #[error("operation cancelled")]
    Cancelled,
}

/// Result alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
