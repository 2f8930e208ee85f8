// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::PathBuf;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::debounce::DebounceWindow;
use crate::engine::{CoreOptions, WatchState};
use crate::types::{EntryKind, WatchEvent, WatchEventKind};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Reconcile every output root against the whole source tree.
    FullReconcile,
    /// Delete the outputs of one removed source path.
    CleanRemoved { path: PathBuf, kind: EntryKind },
    /// Delete the incremental build cache.
    InvalidateCache,
    /// Run the one-shot type generator.
    RegenerateTypes,
    /// Kill the current build process and spawn a new one.
    RestartBuild { reason: String },
    /// Kill the build process and wait for it to exit.
    StopBuild,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub fn idle() -> Self {
        Self::running(Vec::new())
    }
}

/// The batch a debounced restart executes.
pub fn restart_batch(options: &CoreOptions, invalidate_cache: bool, reason: String) -> Vec<CoreCommand> {
    let mut batch = Vec::with_capacity(3);
    if invalidate_cache {
        batch.push(CoreCommand::InvalidateCache);
    }
    if options.regenerate_types {
        batch.push(CoreCommand::RegenerateTypes);
    }
    batch.push(CoreCommand::RestartBuild { reason });
    batch
}

/// Classify one watch event.
///
/// - Additions arm a debounced restart (cache invalidated first).
/// - Removals clean their outputs and the cache right away, so that a burst
///   of removals cannot lose a clean to "last event wins", and then arm a
///   debounced restart if configured.
/// - Changes are left to the build tool's own watch mode.
pub fn handle_watch_event(
    state: WatchState,
    window: &mut DebounceWindow<Vec<CoreCommand>>,
    options: &CoreOptions,
    event: WatchEvent,
    now: Instant,
) -> CoreStep {
    if state != WatchState::Watching {
        debug!(%state, kind = %event.kind, path = %event.path.display(), "ignoring watch event");
        return CoreStep::idle();
    }

    info!("{}: {}", event.kind, event.path.display());
    let reason = format!("{}: {}", event.kind, event.path.display());

    match event.kind {
        WatchEventKind::Added | WatchEventKind::DirAdded => {
            arm(window, restart_batch(options, true, reason), now);
            CoreStep::idle()
        }
        WatchEventKind::Removed | WatchEventKind::DirRemoved => {
            let commands = vec![
                CoreCommand::CleanRemoved {
                    path: event.path,
                    kind: event.kind.entry_kind(),
                },
                CoreCommand::InvalidateCache,
            ];
            if options.restart_on_remove {
                arm(window, restart_batch(options, false, reason), now);
            }
            CoreStep::running(commands)
        }
        WatchEventKind::Changed => CoreStep::idle(),
    }
}

/// The watcher may have missed events: bring every output root back in line
/// now and restart once things settle.
pub fn handle_rescan(
    state: WatchState,
    window: &mut DebounceWindow<Vec<CoreCommand>>,
    options: &CoreOptions,
    path: Option<PathBuf>,
    now: Instant,
) -> CoreStep {
    if state != WatchState::Watching {
        debug!(%state, "ignoring rescan request");
        return CoreStep::idle();
    }

    match &path {
        Some(p) => warn!(path = %p.display(), "watcher requested a rescan; reconciling all outputs"),
        None => warn!("watcher requested a rescan; reconciling all outputs"),
    }
    arm(window, restart_batch(options, false, "watcher rescan".to_string()), now);
    CoreStep::running(vec![CoreCommand::FullReconcile, CoreCommand::InvalidateCache])
}

/// Fire the pending restart if its quiet period is over.
pub fn handle_debounce_elapsed(
    state: WatchState,
    window: &mut DebounceWindow<Vec<CoreCommand>>,
    now: Instant,
) -> CoreStep {
    if state != WatchState::Watching {
        return CoreStep::idle();
    }
    match window.fire_if_due(now) {
        Some(pending) => {
            info!(reason = %pending.reason, "quiet period elapsed");
            CoreStep::running(pending.action)
        }
        None => CoreStep::idle(),
    }
}

/// Final reconciliation, cache invalidation and build stop.
///
/// Any pending restart is dropped; it would only spawn a process we are
/// about to kill.
pub fn handle_shutdown(
    window: &mut DebounceWindow<Vec<CoreCommand>>,
    reason: &str,
) -> CoreStep {
    if let Some(dropped) = window.cancel() {
        debug!(reason = %dropped.reason, "dropping pending restart for shutdown");
    }
    info!(reason, "shutting down");
    CoreStep {
        commands: vec![
            CoreCommand::FullReconcile,
            CoreCommand::InvalidateCache,
            CoreCommand::StopBuild,
        ],
        keep_running: false,
    }
}

fn arm(window: &mut DebounceWindow<Vec<CoreCommand>>, batch: Vec<CoreCommand>, now: Instant) {
    let reason = batch
        .iter()
        .find_map(|c| match c {
            CoreCommand::RestartBuild { reason } => Some(reason.clone()),
            _ => None,
        })
        .unwrap_or_default();
    if window.schedule(batch, reason, now) {
        debug!("superseded pending restart");
    }
}
