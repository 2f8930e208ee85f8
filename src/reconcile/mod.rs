// src/reconcile/mod.rs

//! Output tree reconciliation.
//!
//! - [`extensions`] maps source names to the output names a build emits.
//! - [`differ`] lists trees and computes which outputs are orphaned.
//! - [`reconciler`] deletes orphans (full pass or targeted clean) and prunes
//!   directories left empty.
//! - [`cache`] removes the incremental-build cache file.
//!
//! Nothing in here ever creates or modifies output content.

use std::path::PathBuf;

pub mod cache;
pub mod differ;
pub mod extensions;
pub mod reconciler;

pub use cache::{CacheInvalidator, CacheOutcome};
pub use differ::{
    diff_snapshots, list_tree, ListingPolicy, PlannedDeletion, ReconciliationPlan, TreeDiffer,
    TreeEntry, TreeSnapshot,
};
pub use extensions::ExtensionMap;
pub use reconciler::Reconciler;

/// A deletion that failed for a reason other than "already gone".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one reconciliation pass (full or targeted).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Orphaned outputs that were deleted.
    pub removed: Vec<PathBuf>,
    /// Directories removed because the deletions left them empty.
    pub pruned: Vec<PathBuf>,
    pub failures: Vec<DeletionFailure>,
}

impl ReconcileReport {
    /// True if nothing was deleted and nothing failed.
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.pruned.is_empty() && self.failures.is_empty()
    }
}
