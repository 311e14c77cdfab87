//! Storage capability boundary
//!
//! The sync engine treats object storage as an abstract capability: anything
//! that can list, stream, and delete objects in a bucket can back a
//! [`crate::sync::RemoteStorage`]. A directory-backed implementation for
//! tests and offline use lives in [`fs`].

pub mod fs;

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use thiserror::Error;

/// Error raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// The configured bucket does not exist
    #[error("bucket '{0}' does not exist")]
    BucketNotFound(String),
    /// The requested object does not exist
    #[error("object '{0}' does not exist")]
    ObjectNotFound(String),
    /// The bucket or object is not accessible with the configured credentials
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// A network call exceeded the caller-supplied timeout
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    /// Any other backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Listing entry for one remote object, as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    /// Full object path within the bucket (linux-style separators, no leading "/")
    pub path: String,
    /// Object size in bytes
    pub size: u64,
    /// Provider-supplied content hash (MD5 or ETag-equivalent), when available
    pub hash: Option<String>,
    /// Custom metadata stored alongside the object, when the backend exposes it
    pub metadata: BTreeMap<String, String>,
}

/// Extra metadata attached to an upload
///
/// Produced by the engine's upload hook, see
/// [`crate::sync::RemoteStorage::with_upload_extra`]. Backends that chunk
/// uploads (and therefore report a non-MD5 hash) typically use this to store
/// the source file's MD5 so that [`StorageBackend::extract_hash`] can
/// recover it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Key/value pairs passed through to the backend's upload call
    pub entries: BTreeMap<String, String>,
}

/// Capability interface over one bucket of an object-storage service
///
/// Implementations are expected to honor a per-call timeout where the
/// underlying protocol allows it, surfacing expiry as
/// [`StorageError::Timeout`] (or an `io::ErrorKind::TimedOut` read error on
/// a returned stream). The engine records timeouts per file rather than
/// aborting the batch.
pub trait StorageBackend {
    /// Whether the configured bucket exists
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn bucket_exists(&self) -> Result<bool, StorageError>;

    /// Create the configured bucket
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails, including when the bucket already
    /// exists.
    fn create_bucket(&self) -> Result<(), StorageError>;

    /// List all objects whose path starts with `prefix`
    ///
    /// Prefix matching is character-wise, as in S3: the prefix "a/b" also
    /// lists "a/bc". Callers filter such overlaps out, see
    /// [`crate::index::PathIndexer`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket cannot be listed.
    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectStat>, StorageError>;

    /// Open a byte stream over the object at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or cannot be opened.
    fn get_object(&self, path: &str) -> Result<Box<dyn Read>, StorageError>;

    /// Store `size` bytes from `reader` at `path`, overwriting any existing object
    ///
    /// Returns the stat of the stored object; its `size` reflects the bytes
    /// actually written and is verified by the executor.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    fn put_object(
        &self,
        path: &str,
        reader: &mut dyn Read,
        size: u64,
        extra: Option<&ObjectMetadata>,
    ) -> Result<ObjectStat, StorageError>;

    /// Delete the object at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or cannot be deleted.
    fn delete_object(&self, path: &str) -> Result<(), StorageError>;

    /// Content hash of a listed object
    ///
    /// Defaults to the provider-supplied hash. Backends that do not expose
    /// an MD5-equivalent hash on the object itself (e.g. chunked Azure blob
    /// uploads) override this to read a custom metadata field instead.
    fn extract_hash(&self, object: &ObjectStat) -> Option<String> {
        object.hash.clone()
    }
}
