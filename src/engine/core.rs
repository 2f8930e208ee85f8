// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated watch state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sleeping until the debounce deadline
//! - running reconciliations and driving the build supervisor
//!
//! Time is passed in explicitly, so the core is unit tested without any
//! timers, channels, filesystem, or processes.

use tokio::time::Instant;
use tracing::{info, warn};

use crate::engine::debounce::DebounceWindow;
use crate::engine::event_handlers::{
    handle_debounce_elapsed, handle_rescan, handle_shutdown, handle_watch_event, restart_batch,
    CoreCommand, CoreStep,
};
use crate::engine::{CoreOptions, RuntimeEvent, WatchState};

/// Pure core runtime state.
///
/// This owns:
/// - the watch state
/// - the debounce window holding the pending restart batch
/// - core options
#[derive(Debug)]
pub struct CoreRuntime {
    state: WatchState,
    window: DebounceWindow<Vec<CoreCommand>>,
    options: CoreOptions,
}

impl CoreRuntime {
    pub fn new(options: CoreOptions) -> Self {
        Self {
            state: WatchState::Starting,
            window: DebounceWindow::new(options.quiet_period),
            options,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    /// When the shell should wake up to fire the pending restart.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.window.deadline()
    }

    /// Commands waiting for the quiet period to elapse (for tests).
    pub fn pending_commands(&self) -> Option<&[CoreCommand]> {
        self.window.pending_action().map(Vec::as_slice)
    }

    /// Commands to run before watching begins: optional startup
    /// reconciliation, then the initial build.
    pub fn start(&mut self) -> CoreStep {
        info!(state = %self.state, "orchestrator starting");
        let mut commands = Vec::new();
        if self.options.reconcile_on_startup {
            commands.push(CoreCommand::FullReconcile);
        }
        commands.extend(restart_batch(&self.options, false, "initial build".to_string()));
        CoreStep::running(commands)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent, now: Instant) -> CoreStep {
        match event {
            RuntimeEvent::WatcherReady => {
                if self.state == WatchState::Starting {
                    self.transition(WatchState::Watching);
                    info!("initial scan complete; watching for changes");
                }
                CoreStep::idle()
            }
            RuntimeEvent::Watch(event) => {
                handle_watch_event(self.state, &mut self.window, &self.options, event, now)
            }
            RuntimeEvent::WatcherFault { message } => {
                warn!(error = %message, "watcher error; continuing");
                CoreStep::idle()
            }
            RuntimeEvent::RescanRequired { path } => {
                handle_rescan(self.state, &mut self.window, &self.options, path, now)
            }
            RuntimeEvent::DebounceElapsed => {
                handle_debounce_elapsed(self.state, &mut self.window, now)
            }
            RuntimeEvent::ShutdownRequested { signal } => {
                self.begin_shutdown(&format!("received {signal}"))
            }
        }
    }

    /// Enter `ShuttingDown` and return the cleanup sequence.
    ///
    /// Only the first call produces commands.
    pub fn begin_shutdown(&mut self, reason: &str) -> CoreStep {
        if matches!(self.state, WatchState::ShuttingDown | WatchState::Stopped) {
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }
        self.transition(WatchState::ShuttingDown);
        handle_shutdown(&mut self.window, reason)
    }

    /// Terminal transition, after the shell finished the cleanup sequence.
    pub fn mark_stopped(&mut self) {
        self.transition(WatchState::Stopped);
    }

    fn transition(&mut self, next: WatchState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }
}
