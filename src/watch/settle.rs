// src/watch/settle.rs

//! Per-path write-stability window.
//!
//! Editors and build tools write files in several steps. An event is only
//! released once its path has been quiet for the stability period, and
//! several events for the same path collapse into one.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use crate::engine::debounce::DebounceWindow;
use crate::types::{WatchEvent, WatchEventKind};

/// Kinds seen for one path during its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Settling {
    first: WatchEventKind,
    latest: WatchEventKind,
}

impl Settling {
    /// What the whole window amounts to.
    ///
    /// - A path that was new when the window opened stays an addition, even
    ///   if it was deleted and recreated in between.
    /// - A path that existed before (first seen as removed or changed) and
    ///   exists again is a change: an atomic save.
    /// - Otherwise the latest event wins.
    fn outcome(self) -> WatchEventKind {
        use WatchEventKind::*;
        match (self.first, self.latest) {
            (Added, Added | Changed) => Added,
            (DirAdded, DirAdded | Changed) => DirAdded,
            (Removed | Changed, Added) => Changed,
            (_, latest) => latest,
        }
    }
}

/// Holds raw events until their path settles.
#[derive(Debug)]
pub struct WriteSettler {
    stability: Duration,
    pending: HashMap<PathBuf, DebounceWindow<Settling>>,
}

impl WriteSettler {
    pub fn new(stability: Duration) -> Self {
        Self {
            stability,
            pending: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record an event, re-arming its path's window.
    pub fn offer(&mut self, event: WatchEvent, now: Instant) {
        let stability = self.stability;
        let window = self
            .pending
            .entry(event.path.clone())
            .or_insert_with(|| DebounceWindow::new(stability));
        let first = window
            .pending_action()
            .map_or(event.kind, |settling| settling.first);
        let settling = Settling {
            first,
            latest: event.kind,
        };
        window.schedule(settling, settling.outcome().to_string(), now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().filter_map(DebounceWindow::deadline).min()
    }

    /// Release every event whose path has been quiet long enough, oldest
    /// deadline first.
    pub fn drain_due(&mut self, now: Instant) -> Vec<WatchEvent> {
        let mut due = Vec::new();
        self.pending.retain(|path, window| match window.fire_if_due(now) {
            Some(fired) => {
                due.push((
                    fired.deadline,
                    WatchEvent::new(fired.action.outcome(), path.clone()),
                ));
                false
            }
            None => true,
        });
        due.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path.cmp(&b.1.path)));
        due.into_iter().map(|(_, event)| event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STABLE: Duration = Duration::from_millis(200);

    fn ev(kind: WatchEventKind, path: &str) -> WatchEvent {
        WatchEvent::new(kind, path)
    }

    #[test]
    fn change_does_not_downgrade_addition() {
        let start = Instant::now();
        let mut settler = WriteSettler::new(STABLE);
        settler.offer(ev(WatchEventKind::Added, "/pkg/src/d.ts"), start);
        settler.offer(ev(WatchEventKind::Changed, "/pkg/src/d.ts"), start + Duration::from_millis(50));
        settler.offer(ev(WatchEventKind::Changed, "/pkg/src/d.ts"), start + Duration::from_millis(100));

        assert!(settler.drain_due(start + STABLE).is_empty());
        let out = settler.drain_due(start + Duration::from_millis(100) + STABLE);
        assert_eq!(out, vec![ev(WatchEventKind::Added, "/pkg/src/d.ts")]);
        assert!(settler.is_empty());
    }

    #[test]
    fn atomic_save_becomes_a_change() {
        let now = Instant::now();
        let mut settler = WriteSettler::new(STABLE);
        settler.offer(ev(WatchEventKind::Removed, "/pkg/src/a.ts"), now);
        settler.offer(ev(WatchEventKind::Added, "/pkg/src/a.ts"), now);
        assert_eq!(
            settler.drain_due(now + STABLE),
            vec![ev(WatchEventKind::Changed, "/pkg/src/a.ts")]
        );
    }

    #[test]
    fn new_file_recreated_within_window_stays_added() {
        let now = Instant::now();
        let mut settler = WriteSettler::new(STABLE);
        settler.offer(ev(WatchEventKind::Added, "/pkg/src/new.ts"), now);
        settler.offer(ev(WatchEventKind::Removed, "/pkg/src/new.ts"), now);
        settler.offer(ev(WatchEventKind::Added, "/pkg/src/new.ts"), now);
        assert_eq!(
            settler.drain_due(now + STABLE),
            vec![ev(WatchEventKind::Added, "/pkg/src/new.ts")]
        );
    }

    #[test]
    fn changed_then_replaced_is_still_a_change() {
        let now = Instant::now();
        let mut settler = WriteSettler::new(STABLE);
        settler.offer(ev(WatchEventKind::Changed, "/pkg/src/a.ts"), now);
        settler.offer(ev(WatchEventKind::Removed, "/pkg/src/a.ts"), now);
        settler.offer(ev(WatchEventKind::Added, "/pkg/src/a.ts"), now);
        assert_eq!(
            settler.drain_due(now + STABLE),
            vec![ev(WatchEventKind::Changed, "/pkg/src/a.ts")]
        );
    }

    #[test]
    fn create_then_delete_settles_as_removal() {
        let now = Instant::now();
        let mut settler = WriteSettler::new(STABLE);
        settler.offer(ev(WatchEventKind::Added, "/pkg/src/tmp.ts"), now);
        settler.offer(ev(WatchEventKind::Removed, "/pkg/src/tmp.ts"), now);
        assert_eq!(
            settler.drain_due(now + STABLE),
            vec![ev(WatchEventKind::Removed, "/pkg/src/tmp.ts")]
        );
    }

    #[test]
    fn paths_settle_independently_in_deadline_order() {
        let start = Instant::now();
        let mut settler = WriteSettler::new(STABLE);
        settler.offer(ev(WatchEventKind::Added, "/pkg/src/b.ts"), start);
        settler.offer(ev(WatchEventKind::Removed, "/pkg/src/a.ts"), start + Duration::from_millis(10));

        assert_eq!(settler.next_deadline(), Some(start + STABLE));
        let out = settler.drain_due(start + STABLE + Duration::from_millis(10));
        assert_eq!(
            out,
            vec![
                ev(WatchEventKind::Added, "/pkg/src/b.ts"),
                ev(WatchEventKind::Removed, "/pkg/src/a.ts"),
            ]
        );
    }
}
