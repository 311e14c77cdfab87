//! The sync engine: transactional push, pull, and delete
//!
//! [`RemoteStorage`] ties the pipeline together: index both sides, filter,
//! plan, validate collisions, execute. Validation is all-or-nothing; if the
//! plan has unresolved collisions under the given force setting, a
//! [`CollisionError`] is raised and nothing has been transferred.

mod executor;
pub mod summary;

pub use summary::{SyncSummary, TransferFailure, TransferKind};

use std::collections::BTreeSet;
use std::path::Path;

use crate::config::RemoteStorageConfig;
use crate::error::{CollisionError, ConfigurationError, Result};
use crate::filter::SyncFilter;
use crate::index::{self, ContentDescriptor, PathIndexer};
use crate::plan::{CollisionGuard, DeleteSide, DiffPlanner, SyncDirection, SyncPlan};
use crate::storage::{ObjectMetadata, StorageBackend};
use executor::TransactionExecutor;

/// Hook producing extra upload metadata for one file
///
/// Typically used with backends that chunk uploads and therefore report a
/// non-MD5 hash: the hook stores the source file's MD5 in custom metadata
/// and the backend's `extract_hash` reads it back.
pub type UploadExtraFn = dyn Fn(&ContentDescriptor) -> ObjectMetadata + Send + Sync;

/// Per-operation options
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Plan and validate only; never touch storage
    pub dryrun: bool,
    /// Resolve hash-mismatch collisions by overwriting the target
    pub force: bool,
    /// Include globs over relative paths; any match includes (empty = all)
    pub include_globs: Vec<String>,
    /// Exclude globs over relative paths; any match excludes
    pub exclude_globs: Vec<String>,
    /// Include regex; must match for a path to participate
    pub include_regex: Option<String>,
    /// Exclude regex; a match excludes the path
    pub exclude_regex: Option<String>,
}

impl SyncOptions {
    fn filter(&self) -> std::result::Result<SyncFilter, ConfigurationError> {
        SyncFilter::compile(
            &self.include_globs,
            &self.exclude_globs,
            self.include_regex.as_deref(),
            self.exclude_regex.as_deref(),
        )
    }
}

/// Sync engine over one bucket of a storage backend
pub struct RemoteStorage<B: StorageBackend> {
    backend: B,
    config: RemoteStorageConfig,
    upload_extra: Option<Box<UploadExtraFn>>,
}

impl<B: StorageBackend> RemoteStorage<B> {
    /// Create an engine over `backend`, scoped by the config's base path and
    /// local base dir
    #[must_use]
    pub fn new(backend: B, config: RemoteStorageConfig) -> Self {
        Self {
            backend,
            config,
            upload_extra: None,
        }
    }

    /// Attach a hook that adds custom metadata to every upload
    #[must_use]
    pub fn with_upload_extra(
        mut self,
        hook: impl Fn(&ContentDescriptor) -> ObjectMetadata + Send + Sync + 'static,
    ) -> Self {
        self.upload_extra = Some(Box::new(hook));
        self
    }

    /// The underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether the configured bucket exists
    ///
    /// # Errors
    ///
    /// Fails if existence cannot be determined.
    pub fn bucket_exists(&self) -> Result<bool> {
        Ok(self.backend.bucket_exists()?)
    }

    /// Create the configured bucket
    ///
    /// With `exist_ok`, an already-existing bucket is not an error.
    ///
    /// # Errors
    ///
    /// Fails if creation fails, or if the bucket exists and `exist_ok` is
    /// not set.
    pub fn create_bucket(&self, exist_ok: bool) -> Result<()> {
        if exist_ok && self.backend.bucket_exists()? {
            tracing::debug!(bucket = %self.config.bucket, "bucket already exists");
            return Ok(());
        }
        Ok(self.backend.create_bucket()?)
    }

    /// Push the local file or subtree at `subpath` to the remote namespace
    ///
    /// `subpath` is relative to the configured local base dir; the same
    /// relative location is targeted below the remote base path.
    ///
    /// # Errors
    ///
    /// Fails fast on malformed filters, on an unindexable side, and on
    /// unresolved collisions (in which case nothing was transferred).
    pub fn push(&self, subpath: &str, options: &SyncOptions) -> Result<SyncSummary> {
        let filter = options.filter()?;
        let local = PathIndexer::index_local(self.local_base_dir(), subpath)?;
        let mut remote =
            PathIndexer::index_remote_scope(&self.backend, self.base_path(), &local.scope)?;
        if let Some(name) = &local.restrict {
            remote.retain(|path, _| path == name);
        }

        tracing::info!(
            scope = %local.scope,
            local_files = local.entries.len(),
            remote_files = remote.len(),
            "planning push"
        );
        let plan = DiffPlanner::plan(SyncDirection::Push, &local.entries, &remote, &filter);
        self.run(&plan, &local.scope, options)
    }

    /// Pull the remote file or namespace at `subpath` into the local tree
    ///
    /// `subpath` is relative to the configured remote base path. As a
    /// convenience it may also be an absolute local path below the local
    /// base dir, which is translated to the corresponding relative path.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`RemoteStorage::push`], plus a
    /// [`ConfigurationError`] for an absolute path outside the local base
    /// dir.
    pub fn pull(&self, subpath: &str, options: &SyncOptions) -> Result<SyncSummary> {
        let filter = options.filter()?;
        let subpath = self.resolve_pull_path(subpath)?;
        let remote = PathIndexer::index_remote(&self.backend, self.base_path(), &subpath)?;
        let mut local = PathIndexer::index_local_scope(self.local_base_dir(), &remote.scope)?;
        if let Some(name) = &remote.restrict {
            local.retain(|path, _| path == name);
        }

        tracing::info!(
            scope = %remote.scope,
            remote_files = remote.entries.len(),
            local_files = local.len(),
            "planning pull"
        );
        let plan = DiffPlanner::plan(SyncDirection::Pull, &remote.entries, &local, &filter);
        self.run(&plan, &remote.scope, options)
    }

    /// Delete the remote file or namespace at `remote_path`
    ///
    /// Returns the paths that were deleted (or would be, under dry-run),
    /// relative to the deletion scope. Local files are never touched.
    ///
    /// # Errors
    ///
    /// Fails on malformed filters or if the namespace cannot be listed.
    pub fn delete(&self, remote_path: &str, options: &SyncOptions) -> Result<BTreeSet<String>> {
        let filter = options.filter()?;
        let remote = PathIndexer::index_remote(&self.backend, self.base_path(), remote_path)?;

        let plan = DiffPlanner::plan_delete(&remote.entries, &filter, DeleteSide::Remote);
        tracing::info!(
            scope = %remote.scope,
            count = plan.actions.len(),
            dryrun = options.dryrun,
            "deleting remote files"
        );

        if options.dryrun {
            return Ok(plan.matched_target_files);
        }
        let mut summary = SyncSummary::from_plan(&plan, Vec::new(), false);
        self.executor(&remote.scope).execute(&plan, &mut summary);
        Ok(summary.synced_files)
    }

    /// Validate and execute a plan
    ///
    /// Under dry-run the summary is returned straight after validation; the
    /// executor is never constructed, so storage cannot be touched.
    fn run(&self, plan: &SyncPlan, scope: &str, options: &SyncOptions) -> Result<SyncSummary> {
        let collisions = CollisionGuard::validate(plan, options.force);
        if options.dryrun {
            return Ok(SyncSummary::from_plan(plan, collisions, true));
        }
        if !collisions.is_empty() {
            return Err(CollisionError { collisions }.into());
        }

        let mut summary = SyncSummary::from_plan(plan, collisions, false);
        self.executor(scope).execute(plan, &mut summary);
        Ok(summary)
    }

    fn executor(&self, scope: &str) -> TransactionExecutor<'_> {
        TransactionExecutor::new(
            &self.backend,
            index::join_local(self.local_base_dir(), scope),
            index::join_remote_path(&[self.base_path(), scope]),
            self.upload_extra.as_deref(),
        )
    }

    fn local_base_dir(&self) -> &Path {
        self.config.local_base_dir.as_path()
    }

    fn base_path(&self) -> &str {
        self.config.normalized_base_path()
    }

    /// Translate an absolute local path into a remote-relative subpath
    fn resolve_pull_path(&self, subpath: &str) -> Result<String> {
        let path = Path::new(subpath);
        if !path.is_absolute() {
            return Ok(subpath.to_string());
        }
        let base = self.local_base_dir();
        let rel = path.strip_prefix(base).map_err(|_| ConfigurationError {
            message: format!(
                "absolute path '{}' is not below the local base dir '{}'",
                path.display(),
                base.display()
            ),
        })?;
        Ok(index::normalize_rel_path(&rel.to_string_lossy()))
    }
}
