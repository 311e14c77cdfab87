//! Error taxonomy for sync operations
//!
//! Indexing, collision-validation, and configuration errors are fatal to the
//! whole operation and propagate immediately (nothing has been mutated when
//! they are raised). Per-file transfer failures during execution are *not*
//! errors in this sense: they are recorded in the summary and the batch
//! continues, see [`crate::sync::TransferFailure`].

use std::io;

use thiserror::Error;

use crate::plan::CollisionRecord;
use crate::storage::StorageError;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, SyncError>;

/// Why a root path or remote namespace could not be enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorKind {
    /// The local root or remote bucket/namespace does not exist
    NotFound,
    /// The local root or remote bucket/namespace is not accessible
    PermissionDenied,
    /// Any other I/O failure during enumeration
    Io,
}

/// A local subtree or remote namespace could not be enumerated
#[derive(Debug, Error)]
#[error("cannot index '{path}': {message}")]
pub struct IndexError {
    /// Distinguishes "not found" from "permission denied"
    pub kind: IndexErrorKind,
    /// The root path or namespace that failed to enumerate
    pub path: String,
    /// Human-readable cause
    pub message: String,
}

impl IndexError {
    /// Classify an I/O error encountered while walking a local root
    pub(crate) fn from_io(path: &str, err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => IndexErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => IndexErrorKind::PermissionDenied,
            _ => IndexErrorKind::Io,
        };
        Self {
            kind,
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// Classify a storage error encountered while listing a remote namespace
    pub(crate) fn from_storage(path: &str, err: &StorageError) -> Self {
        let kind = match err {
            StorageError::BucketNotFound(_) | StorageError::ObjectNotFound(_) => {
                IndexErrorKind::NotFound
            }
            StorageError::PermissionDenied(_) => IndexErrorKind::PermissionDenied,
            _ => IndexErrorKind::Io,
        };
        Self {
            kind,
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

/// A plan contained unresolved name collisions and was rejected as a whole
///
/// Nothing has been executed when this error is raised: collision validation
/// happens strictly before the first transfer.
#[derive(Debug, Error)]
#[error("plan rejected, {} unresolved collision(s), nothing was executed: {}", collisions.len(), summarize(collisions))]
pub struct CollisionError {
    /// Every collision found in the plan
    pub collisions: Vec<CollisionRecord>,
}

fn summarize(collisions: &[CollisionRecord]) -> String {
    collisions
        .iter()
        .map(|c| c.relative_path.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A malformed filter expression or invalid operation parameter
///
/// Detected before planning; no partial plan exists when this is raised.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    /// Human-readable description of the invalid input
    pub message: String,
}

impl ConfigurationError {
    /// Error for a glob or regex pattern that failed to compile
    pub(crate) fn invalid_pattern(pattern: &str, cause: &dyn std::fmt::Display) -> Self {
        Self {
            message: format!("invalid filter pattern '{pattern}': {cause}"),
        }
    }
}

/// Top-level error of a push/pull/delete operation
#[derive(Debug, Error)]
pub enum SyncError {
    /// A side of the sync could not be enumerated
    #[error(transparent)]
    Index(#[from] IndexError),
    /// The plan contained unresolved collisions under the given force setting
    #[error(transparent)]
    Collision(#[from] CollisionError),
    /// A filter expression or operation parameter was invalid
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// A bucket lifecycle operation failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_kind_from_io() {
        let err = IndexError::from_io(
            "missing",
            &io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.kind, IndexErrorKind::NotFound);

        let err = IndexError::from_io(
            "locked",
            &io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind, IndexErrorKind::PermissionDenied);
    }

    #[test]
    fn test_collision_error_lists_paths() {
        use crate::plan::CollisionReason;

        let err = CollisionError {
            collisions: vec![
                CollisionRecord {
                    relative_path: "a.txt".to_string(),
                    reason: CollisionReason::HashMismatch,
                },
                CollisionRecord {
                    relative_path: "b/c.txt".to_string(),
                    reason: CollisionReason::TypeMismatch,
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("a.txt"));
        assert!(msg.contains("b/c.txt"));
        assert!(msg.contains("nothing was executed"));
    }
}
