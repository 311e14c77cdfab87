//! Path indexing for local subtrees and remote namespaces
//!
//! An index is a normalized mapping from `/`-separated relative path to
//! [`ContentDescriptor`]. Local indexes are built by walking the filesystem;
//! remote indexes by listing the bucket under a prefix. Content hashes are
//! computed exactly once per path within one operation and are the sole
//! change criterion, never timestamps.

pub mod hash;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{IndexError, IndexErrorKind};
use crate::storage::StorageBackend;
use hash::ContentHasher;

/// Size, content hash, and kind of one indexed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    /// Path relative to the operation scope, always with `/` separators
    pub relative_path: String,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Lowercase hex MD5 of the content; empty when the backend reports none
    pub content_hash: String,
    /// Whether the path is a directory (only local indexes record these)
    pub is_directory: bool,
}

/// Mapping from relative path to descriptor; unique per path by construction
pub type Index = BTreeMap<String, ContentDescriptor>;

/// Index together with the scope it was built under
///
/// `scope` is the requested subpath, or its parent when the subpath names a
/// single file; in that case `restrict` holds the file name and the sync is
/// narrowed to exactly that entry on both sides.
#[derive(Debug, Clone)]
pub struct ScopedIndex {
    /// Subtree prefix (relative to the local base dir / remote base path)
    pub scope: String,
    /// Single-file restriction, when the subpath named a file
    pub restrict: Option<String>,
    /// The indexed entries
    pub entries: Index,
}

/// Builds normalized path indexes for either side of a sync
pub struct PathIndexer;

impl PathIndexer {
    /// Index the local subtree or file at `subpath` below `base_dir`
    ///
    /// # Errors
    ///
    /// Fails with [`IndexErrorKind::NotFound`] if the path does not exist
    /// and [`IndexErrorKind::PermissionDenied`] if it cannot be read.
    pub fn index_local(base_dir: &Path, subpath: &str) -> Result<ScopedIndex, IndexError> {
        let subpath = normalize_rel_path(subpath);
        let root = join_local(base_dir, &subpath);

        if root.is_file() {
            let (scope, name) = split_parent(&subpath);
            let descriptor = describe_local_file(&root, &name)?;
            let mut entries = Index::new();
            entries.insert(name.clone(), descriptor);
            return Ok(ScopedIndex {
                scope,
                restrict: Some(name),
                entries,
            });
        }

        if !root.is_dir() {
            return Err(IndexError {
                kind: IndexErrorKind::NotFound,
                path: root.display().to_string(),
                message: "local path does not exist".to_string(),
            });
        }

        Ok(ScopedIndex {
            entries: Self::index_local_scope(base_dir, &subpath)?,
            scope: subpath,
            restrict: None,
        })
    }

    /// Index the local subtree at `scope`, returning an empty index if it is absent
    ///
    /// Used for the destination side of a pull, where an empty or missing
    /// local directory is the normal case.
    ///
    /// # Errors
    ///
    /// Fails if the subtree exists but cannot be walked.
    pub fn index_local_scope(base_dir: &Path, scope: &str) -> Result<Index, IndexError> {
        let root = join_local(base_dir, scope);
        let mut entries = Index::new();
        if !root.exists() {
            return Ok(entries);
        }

        for entry in WalkDir::new(&root) {
            let entry = entry.map_err(|e| walk_error(&root, &e))?;
            let rel = entry
                .path()
                .strip_prefix(&root)
                .expect("walked entries are under the walk root");
            if rel.as_os_str().is_empty() {
                continue;
            }
            let relative_path = path_to_slash(rel);

            if entry.file_type().is_dir() {
                entries.insert(
                    relative_path.clone(),
                    ContentDescriptor {
                        relative_path,
                        size: 0,
                        content_hash: String::new(),
                        is_directory: true,
                    },
                );
            } else if entry.file_type().is_file() {
                let descriptor = describe_local_file(entry.path(), &relative_path)?;
                entries.insert(relative_path, descriptor);
            }
        }

        Ok(entries)
    }

    /// Index the remote namespace at `subpath` below `base_path`
    ///
    /// Directory markers (zero-size keys with a trailing slash) and objects
    /// listed only because their name shares a character prefix with the
    /// requested path (listing "a/b" also returns "a/bc") are dropped.
    ///
    /// # Errors
    ///
    /// Fails with [`IndexErrorKind::NotFound`] if the bucket is missing and
    /// [`IndexErrorKind::PermissionDenied`] if it is inaccessible.
    pub fn index_remote(
        backend: &dyn StorageBackend,
        base_path: &str,
        subpath: &str,
    ) -> Result<ScopedIndex, IndexError> {
        let subpath = normalize_rel_path(subpath);
        let full_prefix = join_remote_path(&[base_path, &subpath]);
        let objects = backend
            .list_objects(&full_prefix)
            .map_err(|e| IndexError::from_storage(&full_prefix, &e))?;

        // An exact match means the subpath names a single object, not a subtree.
        if !full_prefix.is_empty()
            && let Some(object) = objects.iter().find(|o| o.path == full_prefix)
        {
            let (scope, name) = split_parent(&subpath);
            let mut entries = Index::new();
            entries.insert(
                name.clone(),
                ContentDescriptor {
                    relative_path: name.clone(),
                    size: object.size,
                    content_hash: backend.extract_hash(object).unwrap_or_default(),
                    is_directory: false,
                },
            );
            return Ok(ScopedIndex {
                scope,
                restrict: Some(name),
                entries,
            });
        }

        Ok(ScopedIndex {
            entries: index_from_listing(backend, &full_prefix, objects),
            scope: subpath,
            restrict: None,
        })
    }

    /// Index the remote namespace at an already-resolved `scope`
    ///
    /// # Errors
    ///
    /// Same failure modes as [`PathIndexer::index_remote`].
    pub fn index_remote_scope(
        backend: &dyn StorageBackend,
        base_path: &str,
        scope: &str,
    ) -> Result<Index, IndexError> {
        let full_prefix = join_remote_path(&[base_path, scope]);
        let objects = backend
            .list_objects(&full_prefix)
            .map_err(|e| IndexError::from_storage(&full_prefix, &e))?;
        Ok(index_from_listing(backend, &full_prefix, objects))
    }
}

fn index_from_listing(
    backend: &dyn StorageBackend,
    full_prefix: &str,
    objects: Vec<crate::storage::ObjectStat>,
) -> Index {
    let mut entries = Index::new();
    for object in objects {
        // Directory markers are zero-size keys with a trailing slash. A plain
        // zero-size object is a real (empty) file and must stay indexed, or
        // every push would re-upload it.
        if object.size == 0 && object.path.ends_with('/') {
            tracing::debug!(path = %object.path, "skipping directory marker");
            continue;
        }
        if listed_due_to_prefix_overlap(full_prefix, &object.path) {
            tracing::debug!(path = %object.path, "skipping object listed due to prefix overlap");
            continue;
        }
        let relative_path = object.path[full_prefix.len()..]
            .trim_start_matches('/')
            .to_string();
        let content_hash = backend.extract_hash(&object).unwrap_or_default();
        entries.insert(
            relative_path.clone(),
            ContentDescriptor {
                relative_path,
                size: object.size,
                content_hash,
                is_directory: false,
            },
        );
    }
    entries
}

/// Whether `object_path` was listed only because it shares a character
/// prefix with `prefix` (e.g. listing "pull/this/dir" also returns
/// "pull/this/dir_suffix")
fn listed_due_to_prefix_overlap(prefix: &str, object_path: &str) -> bool {
    if prefix.is_empty() || prefix.ends_with('/') {
        return false;
    }
    let in_selected_dir = object_path
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'));
    let is_selected_object = object_path == prefix;
    !(in_selected_dir || is_selected_object)
}

fn describe_local_file(path: &Path, relative_path: &str) -> Result<ContentDescriptor, IndexError> {
    let metadata =
        std::fs::metadata(path).map_err(|e| IndexError::from_io(&path.display().to_string(), &e))?;
    let content_hash =
        ContentHasher::file(path).map_err(|e| IndexError::from_io(&path.display().to_string(), &e))?;
    Ok(ContentDescriptor {
        relative_path: relative_path.to_string(),
        size: metadata.len(),
        content_hash,
        is_directory: false,
    })
}

fn walk_error(root: &Path, err: &walkdir::Error) -> IndexError {
    match err.io_error() {
        Some(io_err) => IndexError::from_io(&root.display().to_string(), io_err),
        None => IndexError {
            kind: IndexErrorKind::Io,
            path: root.display().to_string(),
            message: err.to_string(),
        },
    }
}

/// Normalize a caller-supplied relative path: linux separators, no
/// surrounding slashes
pub(crate) fn normalize_rel_path(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

/// Join remote path segments with `/`, skipping empty segments; never
/// starts with `/` (some backends refuse leading slashes when listing)
pub(crate) fn join_remote_path(segments: &[&str]) -> String {
    segments
        .iter()
        .flat_map(|s| s.split('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a relative path into (parent, file name)
fn split_parent(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent.to_string(), name.to_string()),
        None => (String::new(), path.to_string()),
    }
}

/// Join a `/`-separated relative path onto a local base directory
pub(crate) fn join_local(base_dir: &Path, rel: &str) -> PathBuf {
    let mut path = base_dir.to_path_buf();
    for segment in rel.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

fn path_to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
