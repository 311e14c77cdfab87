//! Diff planning and collision validation
//!
//! The planner compares two indexes and classifies every filtered path into
//! exactly one [`SyncAction`]. The resulting [`SyncPlan`] is fully
//! materialized and side-effect free, which is what makes dry-run cheap:
//! nothing downstream of planning needs to touch storage to know what would
//! happen.
//!
//! Collision validation is all-or-nothing: a plan with unresolved collisions
//! is rejected as a whole before the first transfer. This is deliberately
//! stricter than last-write-wins sync tools.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::filter::SyncFilter;
use crate::index::{ContentDescriptor, Index};

/// Direction of a sync operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Local is the source, remote is the target
    Push,
    /// Remote is the source, local is the target
    Pull,
}

/// Which side a delete plan operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteSide {
    /// Remove local files
    Local,
    /// Remove remote objects
    Remote,
}

/// One planned operation on a single relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Transfer the local file to the remote target
    Upload {
        /// Local descriptor
        source: ContentDescriptor,
        /// Remote descriptor being overwritten, if any
        target: Option<ContentDescriptor>,
    },
    /// Transfer the remote object to the local target
    Download {
        /// Remote descriptor
        source: ContentDescriptor,
        /// Local descriptor being overwritten, if any
        target: Option<ContentDescriptor>,
    },
    /// Remove a local file
    DeleteLocal {
        /// Descriptor of the file to remove
        target: ContentDescriptor,
    },
    /// Remove a remote object
    DeleteRemote {
        /// Descriptor of the object to remove
        target: ContentDescriptor,
    },
    /// Leave the path alone
    Skip {
        /// The unchanged path
        path: String,
        /// Why it is skipped
        reason: String,
    },
}

impl SyncAction {
    /// The relative path this action operates on
    #[must_use]
    pub fn relative_path(&self) -> &str {
        match self {
            Self::Upload { source, .. } | Self::Download { source, .. } => &source.relative_path,
            Self::DeleteLocal { target } | Self::DeleteRemote { target } => &target.relative_path,
            Self::Skip { path, .. } => path,
        }
    }

    /// Whether executing this action would mutate storage
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Skip { .. })
    }
}

/// Why a path's resolution is ambiguous
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionReason {
    /// Same path, different content hashes; direction must be forced
    HashMismatch,
    /// A file on one side is a directory on the other; never resolvable
    TypeMismatch,
}

/// One unresolved collision found in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionRecord {
    /// Path whose resolution is ambiguous
    pub relative_path: String,
    /// Kind of ambiguity
    pub reason: CollisionReason,
}

/// Fully materialized, side-effect-free description of a sync operation
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Direction of the transfer actions; `None` for pure delete plans
    pub direction: Option<SyncDirection>,
    /// Planned actions; every relative path appears in at most one
    pub actions: Vec<SyncAction>,
    /// Filtered source paths considered by the plan
    pub matched_source_files: BTreeSet<String>,
    /// Filtered target paths considered by the plan
    pub matched_target_files: BTreeSet<String>,
    /// Source paths with no counterpart on the target
    pub not_on_target: BTreeSet<String>,
    /// Target paths with no counterpart on the source
    pub not_on_source: BTreeSet<String>,
    /// File-vs-directory collisions, fatal regardless of force
    pub type_collisions: Vec<CollisionRecord>,
}

impl SyncPlan {
    fn new(direction: Option<SyncDirection>) -> Self {
        Self {
            direction,
            actions: Vec::new(),
            matched_source_files: BTreeSet::new(),
            matched_target_files: BTreeSet::new(),
            not_on_target: BTreeSet::new(),
            not_on_source: BTreeSet::new(),
            type_collisions: Vec::new(),
        }
    }

    /// Number of actions that would mutate storage
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_mutation()).count()
    }
}

/// Compares two indexes and produces a [`SyncPlan`]
pub struct DiffPlanner;

impl DiffPlanner {
    /// Classify every filtered path in the union of both indexes
    ///
    /// Content-hash equality is the sole criterion for "unchanged"; size and
    /// timestamps are never consulted. Paths present only on the target are
    /// recorded but left alone: deletion is an explicit separate operation,
    /// never a byproduct of push or pull.
    #[must_use]
    pub fn plan(
        direction: SyncDirection,
        source: &Index,
        target: &Index,
        filter: &SyncFilter,
    ) -> SyncPlan {
        let source_dirs = directory_prefixes(source);
        let target_dirs = directory_prefixes(target);

        let mut plan = SyncPlan::new(Some(direction));
        let paths: BTreeSet<&String> = source.keys().chain(target.keys()).collect();

        for path in paths {
            let src = source.get(path).filter(|d| !d.is_directory);
            let tgt = target.get(path).filter(|d| !d.is_directory);
            if src.is_none() && tgt.is_none() {
                // Directory entries participate only through prefix checks.
                continue;
            }
            if !filter.matches(path) {
                tracing::debug!(path = %path, "path does not match filters, skipping");
                continue;
            }

            if src.is_some() {
                plan.matched_source_files.insert(path.clone());
            }
            if tgt.is_some() {
                plan.matched_target_files.insert(path.clone());
            }

            // A file on one side colliding with a directory on the other can
            // never be resolved, not even by force.
            if (src.is_some() && target_dirs.contains(path.as_str()))
                || (tgt.is_some() && source_dirs.contains(path.as_str()))
            {
                plan.type_collisions.push(CollisionRecord {
                    relative_path: path.clone(),
                    reason: CollisionReason::TypeMismatch,
                });
                continue;
            }

            match (src, tgt) {
                (Some(s), None) => {
                    plan.not_on_target.insert(path.clone());
                    plan.actions.push(transfer(direction, s.clone(), None));
                }
                (None, Some(_)) => {
                    plan.not_on_source.insert(path.clone());
                }
                (Some(s), Some(t)) if s.content_hash == t.content_hash => {
                    plan.actions.push(SyncAction::Skip {
                        path: path.clone(),
                        reason: "content hashes are equal".to_string(),
                    });
                }
                (Some(s), Some(t)) => {
                    plan.actions
                        .push(transfer(direction, s.clone(), Some(t.clone())));
                }
                (None, None) => unreachable!("at least one side is present"),
            }
        }

        plan
    }

    /// Plan the removal of every filtered entry of `target`
    #[must_use]
    pub fn plan_delete(target: &Index, filter: &SyncFilter, side: DeleteSide) -> SyncPlan {
        let mut plan = SyncPlan::new(None);
        for (path, descriptor) in target {
            if descriptor.is_directory || !filter.matches(path) {
                continue;
            }
            plan.matched_target_files.insert(path.clone());
            plan.actions.push(match side {
                DeleteSide::Local => SyncAction::DeleteLocal {
                    target: descriptor.clone(),
                },
                DeleteSide::Remote => SyncAction::DeleteRemote {
                    target: descriptor.clone(),
                },
            });
        }
        plan
    }
}

fn transfer(
    direction: SyncDirection,
    source: ContentDescriptor,
    target: Option<ContentDescriptor>,
) -> SyncAction {
    match direction {
        SyncDirection::Push => SyncAction::Upload { source, target },
        SyncDirection::Pull => SyncAction::Download { source, target },
    }
}

/// All paths that act as directories in an index: explicit directory entries
/// plus every ancestor of a file path
fn directory_prefixes(index: &Index) -> BTreeSet<&str> {
    let mut prefixes = BTreeSet::new();
    for (path, descriptor) in index {
        if descriptor.is_directory {
            prefixes.insert(path.as_str());
        }
        let mut rest = path.as_str();
        while let Some(pos) = rest.rfind('/') {
            rest = &rest[..pos];
            prefixes.insert(rest);
        }
    }
    prefixes
}

/// Validates a plan for unresolved collisions before anything executes
pub struct CollisionGuard;

impl CollisionGuard {
    /// Collect every collision that makes the plan unexecutable
    ///
    /// Hash mismatches (a transfer overwriting a differently-hashed target)
    /// are collisions unless `force` is set, in which case the acting
    /// direction overwrites the target. Type mismatches are returned
    /// regardless of `force`: a file cannot silently become a directory.
    #[must_use]
    pub fn validate(plan: &SyncPlan, force: bool) -> Vec<CollisionRecord> {
        let mut collisions = plan.type_collisions.clone();
        if !force {
            for action in &plan.actions {
                let overwrites = match action {
                    SyncAction::Upload { target, .. } | SyncAction::Download { target, .. } => {
                        target.is_some()
                    }
                    _ => false,
                };
                if overwrites {
                    collisions.push(CollisionRecord {
                        relative_path: action.relative_path().to_string(),
                        reason: CollisionReason::HashMismatch,
                    });
                }
            }
        }
        collisions.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        collisions
    }
}
