// src/reconcile/reconciler.rs

//! Deletion of orphaned outputs and pruning of directories they leave empty.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ResolvedPaths;
use crate::errors::{is_not_found, DistwatchError, Result};
use crate::fs::FileSystem;
use crate::reconcile::differ::{
    is_orphan, sort_depth_first, PlannedDeletion, ReconciliationPlan, TreeDiffer,
};
use crate::reconcile::extensions::ExtensionMap;
use crate::reconcile::{DeletionFailure, ReconcileReport};
use crate::types::EntryKind;
use crate::watch::path_utils::relative_path;

/// Keeps every output root in line with one source root.
///
/// Strictly deletion-only on the output side and read-only on the source
/// side.
#[derive(Debug, Clone)]
pub struct Reconciler {
    fs: Arc<dyn FileSystem>,
    differ: TreeDiffer,
    source_root: PathBuf,
    output_roots: Vec<PathBuf>,
    cache_file: PathBuf,
}

impl Reconciler {
    pub fn new(fs: Arc<dyn FileSystem>, paths: &ResolvedPaths, extensions: ExtensionMap) -> Self {
        Self {
            differ: TreeDiffer::new(Arc::clone(&fs), extensions),
            fs,
            source_root: paths.source_root.clone(),
            output_roots: paths.output_roots(),
            cache_file: paths.cache_file.clone(),
        }
    }

    /// Paths inside `root` that belong to someone else: nested output roots
    /// and the cache file.
    fn protected_for(&self, root: &Path) -> Vec<PathBuf> {
        let mut protected: Vec<PathBuf> = self
            .output_roots
            .iter()
            .filter(|other| other.as_path() != root && other.starts_with(root))
            .cloned()
            .collect();
        if self.cache_file.starts_with(root) {
            protected.push(self.cache_file.clone());
        }
        protected
    }

    /// Compute one plan per output root without deleting anything.
    pub fn plan_all(&self) -> Result<Vec<ReconciliationPlan>> {
        if !self.fs.is_dir(&self.source_root) {
            return Err(DistwatchError::SourceRootMissing(self.source_root.clone()));
        }
        let source = self.differ.snapshot_source(&self.source_root)?;

        let mut plans = Vec::with_capacity(self.output_roots.len());
        for root in &self.output_roots {
            let protected = self.protected_for(root);
            plans.push(self.differ.diff(&source, root, &protected)?);
        }
        Ok(plans)
    }

    /// Full reconciliation of every output root.
    ///
    /// Fails only when the source tree cannot be listed; individual deletion
    /// faults end up in the report.
    pub fn reconcile_all(&self) -> Result<ReconcileReport> {
        let plans = self.plan_all()?;
        let mut report = ReconcileReport::default();
        for plan in &plans {
            self.apply(plan, &mut report);
        }
        Ok(report)
    }

    /// Delete the direct output counterparts of one removed source path.
    ///
    /// Applies the same orphan rule as [`reconcile_all`](Self::reconcile_all)
    /// but only to the candidate names, so e.g. removing `a.tsx` keeps
    /// `a.js` alive while `a.ts` still exists.
    pub fn clean_removed(&self, source_path: &Path, kind: EntryKind) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let Some(relative) = relative_path(&self.source_root, source_path) else {
            warn!(
                path = %source_path.display(),
                source_root = %self.source_root.display(),
                "removed path is outside the source root; skipping targeted clean"
            );
            return report;
        };
        if relative.as_os_str().is_empty() {
            warn!("source root itself was removed; skipping targeted clean");
            return report;
        }

        let source_kind = |rel: &Path| self.fs.kind_of(&self.source_root.join(rel));
        let candidates = self.counterparts(&relative, kind);

        for root in &self.output_roots {
            let protected = self.protected_for(root);
            let mut entries = Vec::new();
            for rel in &candidates {
                let abs = root.join(rel);
                if protected.contains(&abs) {
                    continue;
                }
                let Some(out_kind) = self.fs.kind_of(&abs) else {
                    continue;
                };
                if is_orphan(rel, out_kind, self.differ.extensions(), &source_kind) {
                    entries.push(PlannedDeletion {
                        relative_path: rel.clone(),
                        kind: out_kind,
                    });
                }
            }
            sort_depth_first(&mut entries);
            let plan = ReconciliationPlan {
                output_root: root.clone(),
                entries,
            };
            self.apply(&plan, &mut report);
        }

        report
    }

    /// Relative output paths a removed source entry may have produced.
    fn counterparts(&self, relative: &Path, kind: EntryKind) -> Vec<PathBuf> {
        match kind {
            EntryKind::Directory => vec![relative.to_path_buf()],
            EntryKind::File => {
                let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
                    return Vec::new();
                };
                let parent = relative.parent().unwrap_or_else(|| Path::new(""));
                self.differ
                    .extensions()
                    .output_names(name)
                    .into_iter()
                    .map(|n| parent.join(n))
                    .collect()
            }
        }
    }

    /// Execute a plan, then prune directories it emptied.
    pub fn apply(&self, plan: &ReconciliationPlan, report: &mut ReconcileReport) {
        let mut parents = BTreeSet::new();

        for entry in &plan.entries {
            let abs = plan.output_root.join(&entry.relative_path);
            let res = match entry.kind {
                EntryKind::File => self.fs.remove_file(&abs),
                EntryKind::Directory => self.fs.remove_dir_all(&abs),
            };
            match res {
                Ok(()) => {
                    info!(path = %abs.display(), "removed orphaned output");
                    report.removed.push(abs.clone());
                }
                Err(err) if is_not_found(&err) => {
                    debug!(path = %abs.display(), "output already gone");
                }
                Err(err) => {
                    warn!(path = %abs.display(), error = %err, "failed to remove orphaned output");
                    report.failures.push(DeletionFailure {
                        path: abs.clone(),
                        error: format!("{err:#}"),
                    });
                }
            }
            if let Some(parent) = abs.parent() {
                parents.insert(parent.to_path_buf());
            }
        }

        if !parents.is_empty() {
            let protected = self.protected_for(&plan.output_root);
            let mut parents: Vec<PathBuf> = parents.into_iter().collect();
            parents.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
            for start in parents {
                self.prune_upwards(&start, &plan.output_root, &protected, report);
            }
        }
    }

    /// Remove `start` and its ancestors while they are empty, stopping below
    /// `root`.
    fn prune_upwards(
        &self,
        start: &Path,
        root: &Path,
        protected: &[PathBuf],
        report: &mut ReconcileReport,
    ) {
        let mut dir = start.to_path_buf();
        while dir != root && dir.starts_with(root) && !protected.contains(&dir) {
            match self.fs.read_dir(&dir) {
                Ok(children) if children.is_empty() => match self.fs.remove_dir(&dir) {
                    Ok(()) => {
                        info!(path = %dir.display(), "pruned empty output directory");
                        report.pruned.push(dir.clone());
                    }
                    Err(err) if is_not_found(&err) => {}
                    Err(err) => {
                        warn!(path = %dir.display(), error = %err, "failed to prune empty directory");
                        report.failures.push(DeletionFailure {
                            path: dir.clone(),
                            error: format!("{err:#}"),
                        });
                        return;
                    }
                },
                Ok(_) => return,
                Err(err) if is_not_found(&err) => {}
                Err(err) => {
                    warn!(path = %dir.display(), error = %err, "cannot inspect directory for pruning");
                    return;
                }
            }

            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => return,
            }
        }
    }
}
