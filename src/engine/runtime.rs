// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::errors::{DistwatchError, Result};
use crate::exec::{BuildSupervisor, ProcessLauncher, TypegenRunner};
use crate::reconcile::{CacheInvalidator, ReconcileReport, Reconciler};
use crate::types::ShutdownSignal;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the watch state machine in response to `RuntimeEvent`s and
/// delegates the work it decides on to the reconciler, the cache invalidator
/// and the build supervisor.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// orchestration semantics.
pub struct Runtime<L: ProcessLauncher> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    supervisor: BuildSupervisor<L>,
    reconciler: Arc<Reconciler>,
    cache: CacheInvalidator,
    typegen: TypegenRunner,
    shutdown_timeout: Duration,
}

impl<L: ProcessLauncher> fmt::Debug for Runtime<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher> Runtime<L> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        supervisor: BuildSupervisor<L>,
        reconciler: Arc<Reconciler>,
        cache: CacheInvalidator,
    ) -> Self {
        Self {
            core,
            event_rx,
            supervisor,
            reconciler,
            cache,
            typegen: TypegenRunner::disabled(),
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_typegen(mut self, typegen: TypegenRunner) -> Self {
        self.typegen = typegen;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Main event loop.
    ///
    /// - Runs the startup commands (reconcile, first build).
    /// - Consumes `RuntimeEvent`s from `event_rx`, waking up on its own when
    ///   the debounce deadline passes.
    /// - Executes commands returned by the core.
    /// - On shutdown, runs the cleanup sequence bounded by the shutdown
    ///   timeout.
    pub async fn run(mut self) -> Result<()> {
        info!("distwatch runtime started");

        let startup = self.core.start();
        for command in startup.commands {
            self.execute_command(command).await;
        }

        let shutdown = loop {
            let deadline = self.core.next_deadline();
            let event = tokio::select! {
                maybe = self.event_rx.recv() => match maybe {
                    Some(e) => e,
                    None => {
                        info!("runtime event channel closed");
                        break self.core.begin_shutdown("event channel closed");
                    }
                },
                () = wait_until(deadline) => RuntimeEvent::DebounceElapsed,
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event, Instant::now());
            if !step.keep_running {
                break step;
            }
            for command in step.commands {
                self.execute_command(command).await;
            }
        };

        let timeout = self.shutdown_timeout;
        let cleanup = async {
            for command in shutdown.commands {
                self.execute_command(command).await;
            }
        };
        if tokio::time::timeout(timeout, cleanup).await.is_err() {
            warn!(?timeout, "shutdown cleanup timed out; exiting anyway");
            self.supervisor.kill();
        }
        self.typegen.abort();

        self.core.mark_stopped();
        info!("runtime exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    ///
    /// Nothing here is fatal: failures are logged and the loop carries on.
    async fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::FullReconcile => {
                let reconciler = Arc::clone(&self.reconciler);
                let res = tokio::task::spawn_blocking(move || reconciler.reconcile_all()).await;
                match res {
                    Ok(Ok(report)) => log_report("full reconciliation", &report),
                    Ok(Err(DistwatchError::SourceRootMissing(root))) => {
                        warn!(
                            source_root = %root.display(),
                            "source root is missing; skipping reconciliation"
                        );
                    }
                    Ok(Err(e)) => warn!(error = %e, "full reconciliation failed"),
                    Err(e) => error!(error = %e, "reconciliation task panicked"),
                }
            }
            CoreCommand::CleanRemoved { path, kind } => {
                let reconciler = Arc::clone(&self.reconciler);
                let res =
                    tokio::task::spawn_blocking(move || reconciler.clean_removed(&path, kind)).await;
                match res {
                    Ok(report) => log_report("targeted clean", &report),
                    Err(e) => error!(error = %e, "targeted clean task panicked"),
                }
            }
            CoreCommand::InvalidateCache => {
                self.cache.invalidate();
            }
            CoreCommand::RegenerateTypes => {
                self.typegen.run();
            }
            CoreCommand::RestartBuild { reason } => {
                info!(%reason, "restarting build");
                if let Err(e) = self.supervisor.restart(&reason) {
                    error!(error = %e, "failed to start build process; waiting for the next change");
                }
            }
            CoreCommand::StopBuild => {
                self.supervisor.stop(self.shutdown_timeout).await;
            }
        }
    }
}

fn log_report(what: &str, report: &ReconcileReport) {
    if report.is_noop() {
        info!("{what}: outputs already in sync");
    } else {
        info!(
            removed = report.removed.len(),
            pruned = report.pruned.len(),
            failed = report.failures.len(),
            "{what} finished"
        );
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}

/// Forward SIGINT / SIGTERM into the runtime as `ShutdownRequested`.
///
/// A second signal while shutdown is in progress is forwarded too; the core
/// ignores it.
pub fn spawn_signal_listener(tx: mpsc::Sender<RuntimeEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let signal = match next_signal().await {
                Ok(signal) => signal,
                Err(e) => {
                    error!(error = %e, "failed to listen for shutdown signals");
                    return;
                }
            };
            info!(%signal, "received shutdown signal");
            if tx.send(RuntimeEvent::ShutdownRequested { signal }).await.is_err() {
                return;
            }
        }
    })
}

#[cfg(unix)]
async fn next_signal() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|()| ShutdownSignal::Interrupt),
        _ = terminate.recv() => Ok(ShutdownSignal::Terminate),
    }
}

#[cfg(not(unix))]
async fn next_signal() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}
