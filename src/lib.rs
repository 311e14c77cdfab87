//! # bucketsync
//!
//! Transactional, hash-based synchronization between a local file tree and an
//! object-storage bucket (S3-compatible, Azure Blob, GCS, ... behind the
//! [`storage::StorageBackend`] trait).
//!
//! A sync operation works like a small, git-like transaction:
//!
//! 1. both sides are enumerated into content-hash indexes,
//! 2. candidate paths are narrowed by glob/regex filters,
//! 3. a side-effect-free [`plan::SyncPlan`] is computed,
//! 4. the plan is validated for name collisions and either rejected as a
//!    whole or executed file by file.
//!
//! Dry-run mode stops after step 4's validation and never touches storage.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod filter;
pub mod index;
pub mod plan;
pub mod storage;
pub mod sync;

pub use config::RemoteStorageConfig;
pub use error::{
    CollisionError, ConfigurationError, IndexError, IndexErrorKind, Result, SyncError,
};
pub use filter::SyncFilter;
pub use index::{ContentDescriptor, PathIndexer};
pub use plan::{
    CollisionGuard, CollisionReason, CollisionRecord, DeleteSide, DiffPlanner, SyncAction,
    SyncDirection, SyncPlan,
};
pub use storage::{ObjectMetadata, ObjectStat, StorageBackend, StorageError, fs::FsBackend};
pub use sync::{RemoteStorage, SyncOptions, SyncSummary, TransferFailure, TransferKind};
