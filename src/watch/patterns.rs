// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::WatchSection;
use crate::types::EntryKind;
use crate::watch::path_utils::relative_str;

/// Compiled include/exclude glob patterns for the source root.
///
/// Patterns are relative to the source root. The watcher passes relative
/// paths (e.g. `"lib/util.ts"`) into [`accepts`](Self::accepts).
#[derive(Clone)]
pub struct WatchFilter {
    root: PathBuf,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchFilter")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatchFilter {
    pub fn new(root: impl Into<PathBuf>, include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set =
            build_globset(include).context("building include globset")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };
        Ok(Self {
            root: root.into(),
            include_set,
            exclude_set,
        })
    }

    pub fn from_config(root: impl Into<PathBuf>, watch: &WatchSection) -> Result<Self> {
        Self::new(root, &watch.include, &watch.exclude)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude_set
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }

    /// Whether a relative file path looks like a source file.
    pub fn is_source_file(&self, rel_path: &str) -> bool {
        self.include_set.is_match(rel_path)
    }

    /// Directories pass unless excluded; files also need an include match.
    pub fn accepts(&self, rel_path: &str, kind: EntryKind) -> bool {
        if rel_path.is_empty() || self.is_excluded(rel_path) {
            return false;
        }
        match kind {
            EntryKind::Directory => true,
            EntryKind::File => self.is_source_file(rel_path),
        }
    }

    /// Relative form of an absolute event path, if it lies under the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        relative_str(&self.root, path)
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
