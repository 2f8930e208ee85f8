// src/reconcile/differ.rs

//! Source vs. output tree comparison.
//!
//! Listing ([`list_tree`]) touches the filesystem; the comparison itself
//! ([`diff_snapshots`]) is pure and works on two [`TreeSnapshot`]s.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::errors::is_not_found;
use crate::fs::FileSystem;
use crate::reconcile::extensions::ExtensionMap;
use crate::types::EntryKind;

/// One entry of a recursively listed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the listed root.
    pub relative_path: PathBuf,
    pub kind: EntryKind,
    /// Final extension, without the dot (`"map"` for `a.js.map`).
    pub extension: Option<String>,
}

impl TreeEntry {
    pub fn new(relative_path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        let relative_path = relative_path.into();
        let extension = match kind {
            EntryKind::File => relative_path
                .extension()
                .map(|e| e.to_string_lossy().into_owned()),
            EntryKind::Directory => None,
        };
        Self {
            relative_path,
            kind,
            extension,
        }
    }
}

/// All entries below a root, keyed by relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    entries: BTreeMap<PathBuf, TreeEntry>,
}

impl TreeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: TreeEntry) {
        self.entries.insert(entry.relative_path.clone(), entry);
    }

    pub fn kind_of(&self, relative: &Path) -> Option<EntryKind> {
        self.entries.get(relative).map(|e| e.kind)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<TreeEntry> for TreeSnapshot {
    fn from_iter<I: IntoIterator<Item = TreeEntry>>(iter: I) -> Self {
        let mut snapshot = TreeSnapshot::new();
        for entry in iter {
            snapshot.insert(entry);
        }
        snapshot
    }
}

/// How [`list_tree`] reacts to an unreadable subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingPolicy {
    /// Abort the whole listing. Used for the source tree: a partial source
    /// listing would make live outputs look orphaned.
    FailFast,
    /// Log and leave the subtree out. Used for output trees: what cannot be
    /// seen is not deleted.
    SkipUnreadable,
}

/// Recursively list `root`, leaving out any path in `skip` (and everything
/// below it).
///
/// A missing `root` yields an empty snapshot.
pub fn list_tree(
    fs: &dyn FileSystem,
    root: &Path,
    skip: &[PathBuf],
    policy: ListingPolicy,
) -> Result<TreeSnapshot> {
    let mut snapshot = TreeSnapshot::new();
    if !fs.is_dir(root) {
        debug!(root = %root.display(), "tree root absent; empty listing");
        return Ok(snapshot);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let children = match fs.read_dir(&dir) {
            Ok(children) => children,
            Err(err) if is_not_found(&err) => continue,
            Err(err) => match policy {
                ListingPolicy::FailFast => return Err(err),
                ListingPolicy::SkipUnreadable => {
                    warn!(dir = %dir.display(), error = %err, "cannot list directory; leaving it untouched");
                    continue;
                }
            },
        };

        for child in children {
            if skip.iter().any(|s| *s == child) {
                continue;
            }
            let Ok(relative) = child.strip_prefix(root) else {
                continue;
            };
            let kind = if fs.is_dir(&child) {
                stack.push(child.clone());
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            snapshot.insert(TreeEntry::new(relative, kind));
        }
    }

    Ok(snapshot)
}

/// One planned deletion, relative to its output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    pub relative_path: PathBuf,
    /// `Directory` means the whole subtree goes.
    pub kind: EntryKind,
}

/// Ordered deletions for one output root, deepest paths first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub output_root: PathBuf,
    pub entries: Vec<PlannedDeletion>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Absolute paths in deletion order.
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.entries
            .iter()
            .map(|e| self.output_root.join(&e.relative_path))
    }
}

/// Decide whether an output entry has no source counterpart.
///
/// `source_kind` answers "what is at this relative path in the source
/// tree?". Shared by the full diff and by targeted cleans so both apply the
/// same rule.
pub fn is_orphan(
    relative: &Path,
    kind: EntryKind,
    extensions: &ExtensionMap,
    source_kind: impl Fn(&Path) -> Option<EntryKind>,
) -> bool {
    match kind {
        EntryKind::Directory => source_kind(relative) != Some(EntryKind::Directory),
        EntryKind::File => {
            let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
                // Non-UTF-8 names never come out of the build; leave them.
                return false;
            };
            let parent = relative.parent().unwrap_or_else(|| Path::new(""));
            !extensions
                .source_candidates(name)
                .iter()
                .any(|candidate| source_kind(&parent.join(candidate)) == Some(EntryKind::File))
        }
    }
}

/// Pure comparison of two snapshots.
///
/// Output directories missing on the source side become a single
/// subtree deletion; nothing below them is reported separately.
pub fn diff_snapshots(
    source: &TreeSnapshot,
    output: &TreeSnapshot,
    extensions: &ExtensionMap,
) -> Vec<PlannedDeletion> {
    let mut planned: Vec<PlannedDeletion> = Vec::new();
    let mut orphan_dirs: Vec<&Path> = Vec::new();

    // BTreeMap order visits a directory before anything below it.
    for entry in output.entries() {
        let rel = entry.relative_path.as_path();
        if orphan_dirs.iter().any(|d| rel.starts_with(d)) {
            continue;
        }
        if is_orphan(rel, entry.kind, extensions, |p| source.kind_of(p)) {
            if entry.kind == EntryKind::Directory {
                orphan_dirs.push(rel);
            }
            planned.push(PlannedDeletion {
                relative_path: rel.to_path_buf(),
                kind: entry.kind,
            });
        }
    }

    sort_depth_first(&mut planned);
    planned
}

/// Deepest paths first, then lexical for a stable order.
pub fn sort_depth_first(planned: &mut [PlannedDeletion]) {
    planned.sort_by(|a, b| {
        let da = a.relative_path.components().count();
        let db = b.relative_path.components().count();
        db.cmp(&da).then_with(|| a.relative_path.cmp(&b.relative_path))
    });
}

/// Filesystem-backed differ for one source root.
#[derive(Debug, Clone)]
pub struct TreeDiffer {
    fs: Arc<dyn FileSystem>,
    extensions: ExtensionMap,
}

impl TreeDiffer {
    pub fn new(fs: Arc<dyn FileSystem>, extensions: ExtensionMap) -> Self {
        Self { fs, extensions }
    }

    pub fn extensions(&self) -> &ExtensionMap {
        &self.extensions
    }

    /// List the source tree. Any listing fault is an error.
    pub fn snapshot_source(&self, source_root: &Path) -> Result<TreeSnapshot> {
        list_tree(self.fs.as_ref(), source_root, &[], ListingPolicy::FailFast)
    }

    /// Plan the deletions for `output_root`, never touching anything in
    /// `protected` (nested output roots, the cache file).
    pub fn diff(
        &self,
        source: &TreeSnapshot,
        output_root: &Path,
        protected: &[PathBuf],
    ) -> Result<ReconciliationPlan> {
        let output = list_tree(
            self.fs.as_ref(),
            output_root,
            protected,
            ListingPolicy::SkipUnreadable,
        )?;
        let entries = diff_snapshots(source, &output, &self.extensions);
        debug!(
            output_root = %output_root.display(),
            output_entries = output.len(),
            planned = entries.len(),
            "computed reconciliation plan"
        );
        Ok(ReconciliationPlan {
            output_root: output_root.to_path_buf(),
            entries,
        })
    }
}
