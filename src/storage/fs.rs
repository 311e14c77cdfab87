//! Directory-backed storage backend
//!
//! Maps a bucket to a directory on the local filesystem and objects to files
//! under it. Used by the test suite and by the CLI's `local` provider; it
//! has no metadata store, so upload `extra` entries are accepted but not
//! persisted.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use super::{ObjectMetadata, ObjectStat, StorageBackend, StorageError};
use crate::index::hash::ContentHasher;

/// Storage backend mapping the bucket to `<root>/<bucket>` on disk
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
    bucket: String,
    timeout: Option<Duration>,
}

impl FsBackend {
    /// Create a backend storing buckets under `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            timeout: None,
        }
    }

    /// Set a per-transfer deadline, surfaced as [`StorageError::Timeout`]
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    fn object_file(&self, path: &str) -> PathBuf {
        let mut file = self.bucket_dir();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            file.push(segment);
        }
        file
    }

    fn require_bucket(&self) -> Result<PathBuf, StorageError> {
        let dir = self.bucket_dir();
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StorageError::BucketNotFound(self.bucket.clone()))
        }
    }

    fn map_io(&self, path: &str, err: &io::Error) -> StorageError {
        match err.kind() {
            io::ErrorKind::NotFound => StorageError::ObjectNotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(path.to_string()),
            io::ErrorKind::TimedOut => {
                StorageError::Timeout(self.timeout.unwrap_or(Duration::ZERO))
            }
            _ => StorageError::Backend(err.to_string()),
        }
    }
}

impl StorageBackend for FsBackend {
    fn bucket_exists(&self) -> Result<bool, StorageError> {
        Ok(self.bucket_dir().is_dir())
    }

    fn create_bucket(&self) -> Result<(), StorageError> {
        if self.bucket_dir().is_dir() {
            return Err(StorageError::Backend(format!(
                "bucket '{}' already exists",
                self.bucket
            )));
        }
        fs::create_dir_all(self.bucket_dir()).map_err(|e| self.map_io(&self.bucket, &e))
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectStat>, StorageError> {
        let dir = self.require_bucket()?;

        let mut objects = Vec::new();
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&dir)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let path = path_to_slash(rel);
            if !path.starts_with(prefix) {
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let hash = ContentHasher::file(entry.path()).map_err(|e| self.map_io(&path, &e))?;
            objects.push(ObjectStat {
                path,
                size: metadata.len(),
                hash: Some(hash),
                metadata: BTreeMap::new(),
            });
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    fn get_object(&self, path: &str) -> Result<Box<dyn Read>, StorageError> {
        self.require_bucket()?;
        let file = File::open(self.object_file(path)).map_err(|e| self.map_io(path, &e))?;
        Ok(Box::new(TimedReader {
            inner: file,
            deadline: self.timeout.map(|t| Instant::now() + t),
        }))
    }

    fn put_object(
        &self,
        path: &str,
        reader: &mut dyn Read,
        _size: u64,
        _extra: Option<&ObjectMetadata>,
    ) -> Result<ObjectStat, StorageError> {
        self.require_bucket()?;
        let file = self.object_file(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|e| self.map_io(path, &e))?;
        }

        let mut timed = TimedReader {
            inner: reader,
            deadline: self.timeout.map(|t| Instant::now() + t),
        };
        let mut out = File::create(&file).map_err(|e| self.map_io(path, &e))?;
        let written = io::copy(&mut timed, &mut out).map_err(|e| self.map_io(path, &e))?;

        let hash = ContentHasher::file(&file).map_err(|e| self.map_io(path, &e))?;
        Ok(ObjectStat {
            path: path.to_string(),
            size: written,
            hash: Some(hash),
            metadata: BTreeMap::new(),
        })
    }

    fn delete_object(&self, path: &str) -> Result<(), StorageError> {
        self.require_bucket()?;
        fs::remove_file(self.object_file(path)).map_err(|e| self.map_io(path, &e))
    }
}

/// Reader that fails with `TimedOut` once its deadline has passed
struct TimedReader<R> {
    inner: R,
    deadline: Option<Instant>,
}

impl<R: Read> Read for TimedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "transfer deadline exceeded",
            ));
        }
        self.inner.read(buf)
    }
}

fn path_to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend(tmp: &TempDir) -> FsBackend {
        let backend = FsBackend::new(tmp.path(), "test-bucket");
        backend.create_bucket().unwrap();
        backend
    }

    fn put(backend: &FsBackend, path: &str, content: &str) {
        let mut bytes = content.as_bytes();
        backend
            .put_object(path, &mut bytes, content.len() as u64, None)
            .unwrap();
    }

    #[test]
    fn test_bucket_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let backend = FsBackend::new(tmp.path(), "bucket");

        assert!(!backend.bucket_exists().unwrap());
        backend.create_bucket().unwrap();
        assert!(backend.bucket_exists().unwrap());

        // Second create is an error; callers opt into exist_ok at the engine level
        assert!(backend.create_bucket().is_err());
    }

    #[test]
    fn test_put_get_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);

        put(&backend, "data/sample.txt", "hello");

        let mut reader = backend.get_object("data/sample.txt").unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_list_objects_prefix_is_characterwise() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);

        put(&backend, "data/a.txt", "a");
        put(&backend, "data/a_backup.txt", "b");
        put(&backend, "other/c.txt", "c");

        let listed = backend.list_objects("data/a").unwrap();
        let paths: Vec<_> = listed.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, vec!["data/a.txt", "data/a_backup.txt"]);
    }

    #[test]
    fn test_list_reports_md5_hash() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);

        put(&backend, "f.txt", "hello world");

        let listed = backend.list_objects("").unwrap();
        assert_eq!(
            listed[0].hash.as_deref(),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        assert_eq!(listed[0].size, 11);
    }

    #[test]
    fn test_get_missing_object() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);

        match backend.get_object("nope.txt") {
            Err(StorageError::ObjectNotFound(path)) => assert_eq!(path, "nope.txt"),
            Err(other) => panic!("expected ObjectNotFound, got {other:?}"),
            Ok(_) => panic!("expected ObjectNotFound, got an object"),
        }
    }

    #[test]
    fn test_list_missing_bucket() {
        let tmp = TempDir::new().unwrap();
        let backend = FsBackend::new(tmp.path(), "ghost");

        assert!(matches!(
            backend.list_objects(""),
            Err(StorageError::BucketNotFound(_))
        ));
    }

    #[test]
    fn test_delete_object() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);

        put(&backend, "doomed.txt", "bye");
        backend.delete_object("doomed.txt").unwrap();
        assert!(backend.list_objects("").unwrap().is_empty());
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);
        put(&backend, "slow.txt", "content");

        let timed = backend.with_timeout(Duration::ZERO);
        let mut reader = timed.get_object("slow.txt").unwrap();
        let mut buf = Vec::new();
        let err = reader.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
