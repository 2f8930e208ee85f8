// src/watch/event_handler.rs

//! Translation of raw notify events into [`WatchEvent`]s.
//!
//! Everything here is synchronous and takes the "does this path exist, and
//! as what" lookup as a parameter, so classification is tested without a
//! real watcher.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use tracing::debug;

use crate::types::{EntryKind, WatchEvent, WatchEventKind};
use crate::watch::patterns::WatchFilter;

/// Result of classifying one notify event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classified {
    pub events: Vec<WatchEvent>,
    /// The backend dropped events; the tree must be rescanned.
    pub rescan: bool,
}

/// Turn a notify event into zero or more filtered watch events.
///
/// - Creations become `Added`/`DirAdded`, removals `Removed`/`DirRemoved`.
/// - A rename is a removal of the old path plus an addition of the new one.
/// - Content writes become `Changed`; metadata and access events are dropped.
/// - For removals of unknown kind the path is gone and cannot be inspected:
///   anything that looks like a source file is taken as a file, everything
///   else as a directory.
pub fn classify<P>(event: &Event, filter: &WatchFilter, lookup: P) -> Classified
where
    P: Fn(&Path) -> Option<EntryKind>,
{
    let mut out = Classified {
        rescan: event.need_rescan(),
        ..Default::default()
    };

    match &event.kind {
        EventKind::Create(kind) => {
            for path in &event.paths {
                let entry = match kind {
                    CreateKind::File => Some(EntryKind::File),
                    CreateKind::Folder => Some(EntryKind::Directory),
                    _ => lookup(path.as_path()),
                };
                if let Some(entry) = entry {
                    push_added(&mut out, filter, path, entry);
                }
            }
        }
        EventKind::Remove(kind) => {
            for path in &event.paths {
                let entry = match kind {
                    RemoveKind::File => EntryKind::File,
                    RemoveKind::Folder => EntryKind::Directory,
                    _ => guess_removed_kind(filter, path),
                };
                push_removed(&mut out, filter, path, entry);
            }
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both => {
                if let [from, to, ..] = event.paths.as_slice() {
                    rename_from(&mut out, filter, from, &lookup, to);
                    rename_to(&mut out, filter, to, &lookup);
                }
            }
            RenameMode::From => {
                for path in &event.paths {
                    push_removed(&mut out, filter, path, guess_removed_kind(filter, path));
                }
            }
            RenameMode::To => {
                for path in &event.paths {
                    rename_to(&mut out, filter, path, &lookup);
                }
            }
            // Backends that do not say which side of a rename this is:
            // whatever still exists was renamed to.
            _ => {
                for path in &event.paths {
                    match lookup(path.as_path()) {
                        Some(entry) => push_added(&mut out, filter, path, entry),
                        None => {
                            push_removed(&mut out, filter, path, guess_removed_kind(filter, path))
                        }
                    }
                }
            }
        },
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            for path in &event.paths {
                if lookup(path.as_path()) == Some(EntryKind::File) {
                    push(&mut out, filter, path, WatchEventKind::Changed);
                }
            }
        }
        other => {
            debug!(kind = ?other, "ignoring notify event kind");
        }
    }

    out
}

fn rename_from<P>(out: &mut Classified, filter: &WatchFilter, from: &Path, lookup: &P, to: &Path)
where
    P: Fn(&Path) -> Option<EntryKind>,
{
    // The old path is gone, but the new one tells us what it was.
    let entry = lookup(to).unwrap_or_else(|| guess_removed_kind(filter, from));
    push_removed(out, filter, from, entry);
}

fn rename_to<P>(out: &mut Classified, filter: &WatchFilter, path: &Path, lookup: &P)
where
    P: Fn(&Path) -> Option<EntryKind>,
{
    if let Some(entry) = lookup(path) {
        push_added(out, filter, path, entry);
    }
}

fn guess_removed_kind(filter: &WatchFilter, path: &Path) -> EntryKind {
    match filter.relative(path) {
        Some(rel) if filter.is_source_file(&rel) => EntryKind::File,
        _ => EntryKind::Directory,
    }
}

fn push_added(out: &mut Classified, filter: &WatchFilter, path: &Path, entry: EntryKind) {
    let kind = match entry {
        EntryKind::File => WatchEventKind::Added,
        EntryKind::Directory => WatchEventKind::DirAdded,
    };
    push(out, filter, path, kind);
}

fn push_removed(out: &mut Classified, filter: &WatchFilter, path: &Path, entry: EntryKind) {
    let kind = match entry {
        EntryKind::File => WatchEventKind::Removed,
        EntryKind::Directory => WatchEventKind::DirRemoved,
    };
    push(out, filter, path, kind);
}

fn push(out: &mut Classified, filter: &WatchFilter, path: &Path, kind: WatchEventKind) {
    let Some(rel) = filter.relative(path) else {
        debug!(path = %path.display(), "event outside source root");
        return;
    };
    if !filter.accepts(&rel, kind.entry_kind()) {
        return;
    }
    out.events.push(WatchEvent::new(kind, PathBuf::from(path)));
}
