// src/engine/mod.rs

//! Orchestration engine for distwatch.
//!
//! This module ties together:
//! - the debounce window that coalesces bursts of file events
//! - the watch state machine (`Starting → Watching → ShuttingDown → Stopped`)
//! - the main runtime event loop that reacts to:
//!   - classified watch events
//!   - watcher readiness, faults and rescans
//!   - debounce deadlines
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::WatchSection;
use crate::types::{ShutdownSignal, WatchEvent};

/// Lifecycle of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Initial build spawned; waiting for the watcher's initial scan.
    Starting,
    Watching,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchState::Starting => "starting",
            WatchState::Watching => "watching",
            WatchState::ShuttingDown => "shutting down",
            WatchState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Options used by the core state machine.
#[derive(Debug, Clone, Copy)]
pub struct CoreOptions {
    /// Idle time after the last event before a restart fires.
    pub quiet_period: Duration,
    /// Also restart the build after removals (targeted clean always runs).
    pub restart_on_remove: bool,
    /// Run a full reconciliation before the first spawn.
    pub reconcile_on_startup: bool,
    /// Run the type generator before every restart.
    pub regenerate_types: bool,
}

impl CoreOptions {
    pub fn from_config(watch: &WatchSection, regenerate_types: bool) -> Self {
        Self {
            quiet_period: Duration::from_millis(watch.quiet_period_ms),
            restart_on_remove: watch.restart_on_remove,
            reconcile_on_startup: watch.reconcile_on_startup,
            regenerate_types,
        }
    }
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self::from_config(&WatchSection::default(), false)
    }
}

/// Events flowing into the runtime from the watcher, timers and signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// The watcher finished registering the source root.
    WatcherReady,
    /// A settled, classified file-system event.
    Watch(WatchEvent),
    /// The watcher reported an error; watching continues.
    WatcherFault { message: String },
    /// The watcher may have dropped events.
    RescanRequired { path: Option<PathBuf> },
    /// The debounce deadline may have passed.
    DebounceElapsed,
    /// Graceful shutdown requested (SIGINT / SIGTERM).
    ShutdownRequested { signal: ShutdownSignal },
}

pub mod core;
pub mod debounce;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use debounce::{DebounceWindow, Pending};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{spawn_signal_listener, Runtime};
