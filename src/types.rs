// src/types.rs

//! Small value types shared by the watcher, reconciler and engine.

use std::fmt;
use std::path::PathBuf;

/// Kind of an entry in a source or output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    File,
    Directory,
}

/// Classified file-system change, relative to nothing in particular: `path`
/// is whatever the watcher reported (absolute in production).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Added,
    Changed,
    Removed,
    DirAdded,
    DirRemoved,
}

impl WatchEventKind {
    /// Kind of the entry the event refers to.
    pub fn entry_kind(self) -> EntryKind {
        match self {
            WatchEventKind::Added | WatchEventKind::Changed | WatchEventKind::Removed => {
                EntryKind::File
            }
            WatchEventKind::DirAdded | WatchEventKind::DirRemoved => EntryKind::Directory,
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchEventKind::Added => "file added",
            WatchEventKind::Changed => "file changed",
            WatchEventKind::Removed => "file removed",
            WatchEventKind::DirAdded => "directory added",
            WatchEventKind::DirRemoved => "directory removed",
        };
        f.write_str(s)
    }
}

/// A single classified change under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// The two OS signals that end a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}
