//! Result reporting for sync operations

use std::collections::BTreeSet;

use serde::Serialize;

use crate::plan::{CollisionReason, CollisionRecord, SyncDirection, SyncPlan};

/// How a per-file transfer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    /// The transfer failed outright (I/O error, size mismatch, ...)
    Failed,
    /// The transfer exceeded the configured timeout
    Timeout,
}

/// A single file that could not be transferred
///
/// Transfer failures do not abort the batch; the remaining files are still
/// attempted and every failure is recorded here.
#[derive(Debug, Clone, Serialize)]
pub struct TransferFailure {
    /// Path of the file that failed
    pub relative_path: String,
    /// Failure classification
    pub kind: TransferKind,
    /// Human-readable cause
    pub message: String,
}

/// Outcome report of one push, pull, or delete operation
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    /// Transfer direction; `None` for delete operations
    pub direction: Option<SyncDirection>,
    /// Files actually transferred or deleted; always empty under dry-run
    pub synced_files: BTreeSet<String>,
    /// Files the plan would transfer or delete
    pub files_to_sync: BTreeSet<String>,
    /// Source files with no counterpart on the target
    pub not_on_target: BTreeSet<String>,
    /// Target files with no counterpart on the source (never touched)
    pub not_on_source: BTreeSet<String>,
    /// Filtered source paths considered by the operation
    pub matched_source_files: BTreeSet<String>,
    /// Filtered target paths considered by the operation
    pub matched_target_files: BTreeSet<String>,
    /// Collisions found during validation
    ///
    /// Non-empty only under dry-run; a real run raises
    /// [`crate::error::CollisionError`] instead of producing a summary.
    pub collisions: Vec<CollisionRecord>,
    /// Per-file transfer failures; the batch continued past each of them
    pub errors: Vec<TransferFailure>,
    /// Whether this summary describes a dry run
    pub dryrun: bool,
}

impl SyncSummary {
    /// Build a summary carrying over the plan's classification sets
    #[must_use]
    pub fn from_plan(plan: &SyncPlan, collisions: Vec<CollisionRecord>, dryrun: bool) -> Self {
        Self {
            direction: plan.direction,
            synced_files: BTreeSet::new(),
            files_to_sync: plan
                .actions
                .iter()
                .filter(|a| a.is_mutation())
                .map(|a| a.relative_path().to_string())
                .collect(),
            not_on_target: plan.not_on_target.clone(),
            not_on_source: plan.not_on_source.clone(),
            matched_source_files: plan.matched_source_files.clone(),
            matched_target_files: plan.matched_target_files.clone(),
            collisions,
            errors: Vec::new(),
            dryrun,
        }
    }

    /// Whether the operation completed without failures or collisions
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.collisions.is_empty()
    }

    /// Number of files the plan would transfer or delete
    #[must_use]
    pub fn files_to_sync_count(&self) -> usize {
        self.files_to_sync.len()
    }

    /// Whether re-running without dry-run would need `force` to proceed
    #[must_use]
    pub fn requires_force(&self) -> bool {
        self.collisions
            .iter()
            .any(|c| c.reason == CollisionReason::HashMismatch)
    }

    /// Render the summary as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{CollisionReason, DiffPlanner};
    use crate::{ContentDescriptor, SyncFilter};

    fn plan_with_one_upload() -> SyncPlan {
        let mut source = crate::index::Index::new();
        source.insert(
            "a.txt".to_string(),
            ContentDescriptor {
                relative_path: "a.txt".to_string(),
                size: 1,
                content_hash: "x".to_string(),
                is_directory: false,
            },
        );
        DiffPlanner::plan(
            SyncDirection::Push,
            &source,
            &crate::index::Index::new(),
            &SyncFilter::match_all(),
        )
    }

    #[test]
    fn test_from_plan_carries_classification() {
        let plan = plan_with_one_upload();
        let summary = SyncSummary::from_plan(&plan, Vec::new(), false);

        assert_eq!(summary.direction, Some(SyncDirection::Push));
        assert!(summary.not_on_target.contains("a.txt"));
        assert!(summary.synced_files.is_empty());
        assert_eq!(summary.files_to_sync_count(), 1);
        assert!(summary.is_success());
    }

    #[test]
    fn test_collisions_make_summary_unsuccessful() {
        let plan = plan_with_one_upload();
        let collisions = vec![CollisionRecord {
            relative_path: "a.txt".to_string(),
            reason: CollisionReason::HashMismatch,
        }];
        let summary = SyncSummary::from_plan(&plan, collisions, true);

        assert!(!summary.is_success());
        assert!(summary.requires_force());
    }

    #[test]
    fn test_json_rendering() {
        let plan = plan_with_one_upload();
        let summary = SyncSummary::from_plan(&plan, Vec::new(), true);

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"direction\": \"push\""));
        assert!(json.contains("\"dryrun\": true"));
        assert!(json.contains("a.txt"));
    }
}
