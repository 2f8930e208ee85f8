// src/exec/supervisor.rs

//! Single-instance ownership of the build process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::backend::{LaunchedProcess, ProcessLauncher, ProcessStatus};

/// The build process currently recorded by the supervisor.
#[derive(Debug)]
pub struct SupervisedProcess {
    generation: u64,
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    status: Arc<ProcessStatus>,
    monitor: Option<JoinHandle<()>>,
}

impl SupervisedProcess {
    fn new(generation: u64, launched: LaunchedProcess) -> Self {
        Self {
            generation,
            pid: launched.pid,
            kill_tx: Some(launched.kill_tx),
            status: launched.status,
            monitor: launched.monitor,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    /// Ask the process to terminate without waiting for it.
    ///
    /// Always marks the kill as requested, even if the process already
    /// exited, so its exit is never reported as a failure.
    fn request_kill(&mut self) -> bool {
        self.status.request_kill();
        match self.kill_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Owns the lifecycle of at most one build process.
///
/// All mutation goes through [`restart`](Self::restart) and
/// [`kill`](Self::kill); the handle is never shared.
pub struct BuildSupervisor<L: ProcessLauncher> {
    launcher: L,
    current: Option<SupervisedProcess>,
    /// Monitors of killed processes that may still be exiting.
    retiring: Vec<JoinHandle<()>>,
    generation: u64,
}

impl<L: ProcessLauncher> BuildSupervisor<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            current: None,
            retiring: Vec::new(),
            generation: 0,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Kill whatever is recorded, then spawn a fresh process.
    ///
    /// The old process is only asked to terminate; its exit may race with
    /// the new spawn. The new process becomes current only once its spawn
    /// succeeded, so on error nothing is recorded.
    pub fn restart(&mut self, reason: &str) -> Result<u64> {
        if let Some(old) = self.current.take() {
            info!(
                generation = old.generation,
                pid = old.pid,
                reason,
                "stopping build process for restart"
            );
            self.retire(old);
        }

        let generation = self.generation + 1;
        let launched = self.launcher.launch(generation)?;
        self.generation = generation;

        info!(generation, reason, "build process (re)started");
        self.current = Some(SupervisedProcess::new(generation, launched));
        Ok(generation)
    }

    /// Terminate the current process, if any. Returns true if one was
    /// recorded.
    pub fn kill(&mut self) -> bool {
        match self.current.take() {
            Some(proc) => {
                info!(generation = proc.generation, pid = proc.pid, "killing build process");
                self.retire(proc);
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current.as_ref().is_some_and(SupervisedProcess::is_alive)
    }

    pub fn current(&self) -> Option<&SupervisedProcess> {
        self.current.as_ref()
    }

    /// Kill the current process and wait up to `grace` for every process we
    /// have ever asked to stop to actually exit.
    pub async fn stop(&mut self, grace: Duration) {
        self.kill();
        let pending: Vec<JoinHandle<()>> = self.retiring.drain(..).collect();
        if pending.is_empty() {
            return;
        }

        let wait_all = async {
            for handle in pending {
                if let Err(e) = handle.await {
                    debug!(error = %e, "build process monitor ended abnormally");
                }
            }
        };
        if tokio::time::timeout(grace, wait_all).await.is_err() {
            warn!(?grace, "build process did not exit within the grace period");
        }
    }

    fn retire(&mut self, mut proc: SupervisedProcess) {
        let delivered = proc.request_kill();
        if !delivered {
            debug!(generation = proc.generation, "build process had already exited");
        }
        self.retiring.retain(|h| !h.is_finished());
        if let Some(monitor) = proc.monitor.take() {
            self.retiring.push(monitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::errors::DistwatchError;

    /// Records every launch; optionally fails a given generation.
    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<(u64, Arc<ProcessStatus>, oneshot::Receiver<()>)>>,
        fail_generation: Option<u64>,
    }

    impl ProcessLauncher for RecordingLauncher {
        fn launch(&self, generation: u64) -> Result<LaunchedProcess> {
            if self.fail_generation == Some(generation) {
                return Err(DistwatchError::Spawn {
                    cmd: "tsup --watch".into(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            let (kill_tx, kill_rx) = oneshot::channel();
            let status = ProcessStatus::new();
            self.launched
                .lock()
                .unwrap()
                .push((generation, Arc::clone(&status), kill_rx));
            Ok(LaunchedProcess {
                pid: Some(1000 + generation as u32),
                kill_tx,
                status,
                monitor: None,
            })
        }
    }

    #[test]
    fn rapid_restarts_leave_one_unkilled_process() {
        let mut sup = BuildSupervisor::new(RecordingLauncher::default());
        for _ in 0..5 {
            sup.restart("file added").unwrap();
        }

        let launched = sup.launcher().launched.lock().unwrap();
        assert_eq!(launched.len(), 5);
        let (last, prior) = launched.split_last().unwrap();
        assert!(prior.iter().all(|(_, status, _)| status.kill_requested()));
        assert!(!last.1.kill_requested());
        assert_eq!(sup.current().map(SupervisedProcess::generation), Some(5));
    }

    #[test]
    fn failed_spawn_records_nothing() {
        let launcher = RecordingLauncher {
            fail_generation: Some(2),
            ..Default::default()
        };
        let mut sup = BuildSupervisor::new(launcher);
        sup.restart("startup").unwrap();

        assert!(sup.restart("file added").is_err());
        assert!(sup.current().is_none());
        assert!(!sup.is_alive());

        let launched = sup.launcher().launched.lock().unwrap();
        assert!(launched[0].1.kill_requested());
    }

    #[test]
    fn kill_before_restart_is_observable_on_dead_handle() {
        let mut sup = BuildSupervisor::new(RecordingLauncher::default());
        sup.restart("startup").unwrap();
        // The process exits on its own before the next restart.
        {
            let launched = sup.launcher().launched.lock().unwrap();
            launched[0].1.mark_exited(Some(1));
        }
        assert!(!sup.is_alive());

        sup.restart("file added").unwrap();
        let launched = sup.launcher().launched.lock().unwrap();
        assert!(launched[0].1.kill_requested());
    }

    #[test]
    fn kill_reports_whether_anything_was_running() {
        let mut sup = BuildSupervisor::new(RecordingLauncher::default());
        assert!(!sup.kill());
        sup.restart("startup").unwrap();
        assert!(sup.kill());
        assert!(!sup.kill());
    }
}
