// src/watch/known.rs

//! Set of source files known to exist under the watched root.
//!
//! notify reports "something was created or renamed onto this path"; only a
//! record of what already existed tells a genuinely new file apart from an
//! editor saving over an existing one via rename.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::types::{EntryKind, WatchEvent, WatchEventKind};
use crate::watch::patterns::WatchFilter;

#[derive(Debug, Default, Clone)]
pub struct KnownFiles {
    paths: HashSet<PathBuf>,
}

impl KnownFiles {
    /// List every accepted source file below the filter's root.
    pub fn scan(fs: &dyn FileSystem, filter: &WatchFilter) -> Self {
        let mut known = Self::default();
        known.insert_tree(fs, filter, filter.root());
        debug!(files = known.len(), "indexed existing source files");
        known
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Update the set from classified events, in order, turning additions
    /// of files that already existed into changes.
    pub fn apply(
        &mut self,
        events: Vec<WatchEvent>,
        fs: &dyn FileSystem,
        filter: &WatchFilter,
    ) -> Vec<WatchEvent> {
        events
            .into_iter()
            .map(|mut event| {
                match event.kind {
                    WatchEventKind::Added => {
                        if !self.paths.insert(event.path.clone()) {
                            debug!(path = %event.path.display(), "replaced existing file");
                            event.kind = WatchEventKind::Changed;
                        }
                    }
                    WatchEventKind::Changed => {
                        self.paths.insert(event.path.clone());
                    }
                    WatchEventKind::Removed => {
                        self.paths.remove(&event.path);
                    }
                    WatchEventKind::DirAdded => self.insert_tree(fs, filter, &event.path),
                    WatchEventKind::DirRemoved => {
                        self.paths.retain(|p| !p.starts_with(&event.path));
                    }
                }
                event
            })
            .collect()
    }

    /// Walk `dir`, skipping excluded directories, and record accepted files.
    fn insert_tree(&mut self, fs: &dyn FileSystem, filter: &WatchFilter, dir: &Path) {
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let children = match fs.read_dir(&current) {
                Ok(children) => children,
                Err(err) => {
                    warn!(dir = %current.display(), error = %err, "cannot list source directory");
                    continue;
                }
            };
            for child in children {
                let Some(rel) = filter.relative(&child) else {
                    continue;
                };
                if fs.is_dir(&child) {
                    if filter.accepts(&rel, EntryKind::Directory) {
                        stack.push(child);
                    }
                } else if filter.accepts(&rel, EntryKind::File) {
                    self.paths.insert(child);
                }
            }
        }
    }
}
