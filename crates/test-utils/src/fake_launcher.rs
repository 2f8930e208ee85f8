use std::sync::{Arc, Mutex};

use distwatch::errors::{DistwatchError, Result};
use distwatch::exec::{LaunchedProcess, ProcessLauncher, ProcessStatus};
use tokio::sync::oneshot;

/// One recorded launch.
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub generation: u64,
    pub status: Arc<ProcessStatus>,
}

#[derive(Debug, Default)]
struct Inner {
    launches: Vec<LaunchRecord>,
    fail_next: usize,
}

/// A fake launcher that:
/// - records every launch
/// - "runs" each process as a task that exits as soon as a kill is requested
/// - can be told to fail the next launches with a spawn error.
///
/// Clones share state, so a test keeps one clone while the supervisor owns
/// the other.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    inner: Arc<Mutex<Inner>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_launches(&self, n: usize) {
        self.inner.lock().unwrap().fail_next = n;
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.inner.lock().unwrap().launches.clone()
    }

    pub fn launch_count(&self) -> usize {
        self.inner.lock().unwrap().launches.len()
    }

    /// Number of launched processes that have not exited yet.
    pub fn live_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .launches
            .iter()
            .filter(|r| r.status.is_alive())
            .count()
    }

    /// Simulate the newest process exiting on its own.
    pub fn exit_latest(&self, code: i32) {
        if let Some(last) = self.inner.lock().unwrap().launches.last() {
            last.status.mark_exited(Some(code));
        }
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, generation: u64) -> Result<LaunchedProcess> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(DistwatchError::Spawn {
                cmd: "fake".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let status = ProcessStatus::new();
        inner.launches.push(LaunchRecord {
            generation,
            status: Arc::clone(&status),
        });

        let task_status = Arc::clone(&status);
        let monitor = tokio::spawn(async move {
            // Either an explicit kill or the supervisor dropping its handle.
            let _ = kill_rx.await;
            task_status.request_kill();
            task_status.mark_exited(None);
        });

        Ok(LaunchedProcess {
            pid: None,
            kill_tx,
            status,
            monitor: Some(monitor),
        })
    }
}
