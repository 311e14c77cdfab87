//! Plan execution against a storage backend
//!
//! Executes validated plans action by action. A failing transfer never
//! aborts the batch: the failure is recorded and the remaining actions are
//! still attempted. Dry-run never reaches this module; the engine returns
//! the summary straight after validation.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::PathBuf;

use crate::index::{self, ContentDescriptor};
use crate::plan::{SyncAction, SyncPlan};
use crate::storage::{StorageBackend, StorageError};

use super::UploadExtraFn;
use super::summary::{SyncSummary, TransferFailure, TransferKind};

pub(crate) struct TransactionExecutor<'a> {
    backend: &'a dyn StorageBackend,
    local_root: PathBuf,
    remote_prefix: String,
    upload_extra: Option<&'a UploadExtraFn>,
}

impl<'a> TransactionExecutor<'a> {
    pub(crate) fn new(
        backend: &'a dyn StorageBackend,
        local_root: PathBuf,
        remote_prefix: String,
        upload_extra: Option<&'a UploadExtraFn>,
    ) -> Self {
        Self {
            backend,
            local_root,
            remote_prefix,
            upload_extra,
        }
    }

    /// Run every mutating action of `plan`, recording outcomes in `summary`
    pub(crate) fn execute(&self, plan: &SyncPlan, summary: &mut SyncSummary) {
        for action in &plan.actions {
            if !action.is_mutation() {
                tracing::debug!(path = %action.relative_path(), "unchanged, skipping");
                continue;
            }
            let path = action.relative_path().to_string();
            match self.apply(action) {
                Ok(()) => {
                    tracing::info!(path = %path, "synced");
                    summary.synced_files.insert(path);
                }
                Err(failure) => {
                    tracing::warn!(
                        path = %failure.relative_path,
                        kind = ?failure.kind,
                        "transfer failed: {}",
                        failure.message
                    );
                    summary.errors.push(failure);
                }
            }
        }
    }

    fn apply(&self, action: &SyncAction) -> Result<(), TransferFailure> {
        match action {
            SyncAction::Upload { source, .. } => self.upload(source),
            SyncAction::Download { source, .. } => self.download(source),
            SyncAction::DeleteLocal { target } => {
                fs::remove_file(self.local_path(&target.relative_path))
                    .map_err(|e| fail_io(&target.relative_path, &e))
            }
            SyncAction::DeleteRemote { target } => self
                .backend
                .delete_object(&self.remote_path(&target.relative_path))
                .map_err(|e| fail_storage(&target.relative_path, &e)),
            SyncAction::Skip { .. } => Ok(()),
        }
    }

    fn upload(&self, source: &ContentDescriptor) -> Result<(), TransferFailure> {
        let rel = &source.relative_path;
        let file = File::open(self.local_path(rel)).map_err(|e| fail_io(rel, &e))?;
        let mut reader = BufReader::new(file);
        let extra = self.upload_extra.map(|hook| hook(source));

        let stat = self
            .backend
            .put_object(&self.remote_path(rel), &mut reader, source.size, extra.as_ref())
            .map_err(|e| fail_storage(rel, &e))?;

        if stat.size != source.size {
            return Err(TransferFailure {
                relative_path: rel.clone(),
                kind: TransferKind::Failed,
                message: format!("uploaded {} of {} bytes", stat.size, source.size),
            });
        }
        Ok(())
    }

    fn download(&self, source: &ContentDescriptor) -> Result<(), TransferFailure> {
        let rel = &source.relative_path;
        let mut reader = self
            .backend
            .get_object(&self.remote_path(rel))
            .map_err(|e| fail_storage(rel, &e))?;

        let local = self.local_path(rel);
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| fail_io(rel, &e))?;
        }
        let mut out = File::create(&local).map_err(|e| fail_io(rel, &e))?;

        let written = match io::copy(&mut reader, &mut out) {
            Ok(written) => written,
            Err(e) => {
                drop(out);
                // A partial file must not survive as a seemingly valid copy.
                let _ = fs::remove_file(&local);
                return Err(fail_io(rel, &e));
            }
        };
        if written != source.size {
            drop(out);
            let _ = fs::remove_file(&local);
            return Err(TransferFailure {
                relative_path: rel.clone(),
                kind: TransferKind::Failed,
                message: format!("downloaded {written} of {} bytes", source.size),
            });
        }
        Ok(())
    }

    fn local_path(&self, rel: &str) -> PathBuf {
        index::join_local(&self.local_root, rel)
    }

    fn remote_path(&self, rel: &str) -> String {
        index::join_remote_path(&[&self.remote_prefix, rel])
    }
}

fn fail_io(path: &str, err: &io::Error) -> TransferFailure {
    let kind = if err.kind() == io::ErrorKind::TimedOut {
        TransferKind::Timeout
    } else {
        TransferKind::Failed
    };
    TransferFailure {
        relative_path: path.to_string(),
        kind,
        message: err.to_string(),
    }
}

fn fail_storage(path: &str, err: &StorageError) -> TransferFailure {
    let kind = if matches!(err, StorageError::Timeout(_)) {
        TransferKind::Timeout
    } else {
        TransferKind::Failed
    };
    TransferFailure {
        relative_path: path.to_string(),
        kind,
        message: err.to_string(),
    }
}
