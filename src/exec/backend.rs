// src/exec/backend.rs

//! Pluggable process launcher abstraction.
//!
//! The supervisor talks to a `ProcessLauncher` instead of spawning
//! `tokio::process::Command`s itself. This makes it easy to swap in a fake
//! launcher in tests while keeping the production spawning logic here.
//!
//! - `ShellLauncher` is the implementation used by `distwatch`. It runs the
//!   build command through the platform shell and watches the child from a
//!   background task.
//! - Tests can provide their own `ProcessLauncher` that records launches and
//!   never touches the OS.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BuildSection;
use crate::errors::{DistwatchError, Result};
use crate::exec::stream_filter::{spawn_stderr_forwarder, StderrFilter};

/// Liveness of one launched process, shared between the supervisor and the
/// task that waits on the child.
#[derive(Debug)]
pub struct ProcessStatus {
    alive: AtomicBool,
    kill_requested: AtomicBool,
    exit_code: Mutex<Option<i32>>,
}

impl ProcessStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(true),
            kill_requested: AtomicBool::new(false),
            exit_code: Mutex::new(None),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn kill_requested(&self) -> bool {
        self.kill_requested.load(Ordering::SeqCst)
    }

    pub fn request_kill(&self) {
        self.kill_requested.store(true, Ordering::SeqCst);
    }

    /// Record that the process is gone. `code` is `None` when it was killed by
    /// a signal.
    pub fn mark_exited(&self, code: Option<i32>) {
        if let Ok(mut slot) = self.exit_code.lock() {
            *slot = code;
        }
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code.lock().ok().and_then(|slot| *slot)
    }
}

/// Everything the supervisor needs to track and terminate a launched
/// process.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub pid: Option<u32>,
    /// Sending (or dropping) this asks the process to terminate.
    pub kill_tx: oneshot::Sender<()>,
    pub status: Arc<ProcessStatus>,
    /// Task that waits for the process; finishes once it has exited.
    pub monitor: Option<JoinHandle<()>>,
}

/// Trait abstracting how the build process is started.
///
/// Production code uses [`ShellLauncher`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessLauncher: Send + Sync {
    /// Start generation `generation` of the build process.
    ///
    /// Returns only once the spawn itself has succeeded or failed; the
    /// process then runs in the background.
    fn launch(&self, generation: u64) -> Result<LaunchedProcess>;
}

/// The resolved build invocation.
#[derive(Debug, Clone)]
pub struct BuildCommand {
    pub command_line: String,
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    pub stderr_filter: Arc<StderrFilter>,
}

impl BuildCommand {
    pub fn from_config(build: &BuildSection, working_dir: &Path) -> Self {
        let mut env = build.env.clone();
        env.insert(build.mode_var.clone(), build.mode.clone());
        Self {
            command_line: build.command_line(),
            env,
            working_dir: working_dir.to_path_buf(),
            stderr_filter: Arc::new(StderrFilter::new(&build.suppress_stderr)),
        }
    }
}

/// Build a shell command appropriate for the platform.
///
/// With `exec` on unix the shell replaces itself with the command, so
/// signals sent to the child reach the tool and not just `sh`.
pub fn shell_command(line: &str, exec: bool) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        if exec {
            c.arg("-c").arg(format!("exec {line}"));
        } else {
            c.arg("-c").arg(line);
        }
        c
    }
}

/// Launches the build command through the platform shell.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    command: BuildCommand,
}

impl ShellLauncher {
    pub fn new(command: BuildCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &BuildCommand {
        &self.command
    }
}

impl ProcessLauncher for ShellLauncher {
    fn launch(&self, generation: u64) -> Result<LaunchedProcess> {
        let build = &self.command;
        let filter_stderr = !build.stderr_filter.is_empty();

        let mut cmd = shell_command(&build.command_line, true);
        cmd.current_dir(&build.working_dir)
            .envs(&build.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(if filter_stderr {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| DistwatchError::Spawn {
            cmd: build.command_line.clone(),
            source,
        })?;

        let pid = child.id();
        info!(generation, pid, cmd = %build.command_line, "started build process");

        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_forwarder(stderr, Arc::clone(&build.stderr_filter), generation);
        }

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let status = ProcessStatus::new();
        let monitor = tokio::spawn(monitor_child(child, kill_rx, Arc::clone(&status), generation));

        Ok(LaunchedProcess {
            pid,
            kill_tx,
            status,
            monitor: Some(monitor),
        })
    }
}

/// Wait for the child to exit on its own or for a kill request, whichever
/// comes first.
async fn monitor_child(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    status: Arc<ProcessStatus>,
    generation: u64,
) {
    tokio::select! {
        res = child.wait() => {
            match res {
                Ok(exit) => {
                    let code = exit.code();
                    status.mark_exited(code);
                    if exit.success() {
                        info!(generation, "build process exited");
                    } else if status.kill_requested() {
                        debug!(generation, ?code, "build process exited after kill request");
                    } else {
                        // Left to the next file event to restart.
                        warn!(generation, exit_code = ?code, "build process exited with failure");
                    }
                }
                Err(e) => {
                    status.mark_exited(None);
                    warn!(generation, error = %e, "failed to wait for build process");
                }
            }
        }

        cancel = &mut kill_rx => {
            status.request_kill();
            if cancel.is_err() {
                debug!(generation, "supervisor handle dropped; killing build process");
            } else {
                info!(generation, "terminating build process");
            }
            if let Err(e) = child.kill().await {
                warn!(generation, error = %e, "failed to kill build process");
            }
            let code = child.try_wait().ok().flatten().and_then(|s| s.code());
            status.mark_exited(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_command_sets_mode_variable() {
        let build = BuildSection::default();
        let cmd = BuildCommand::from_config(&build, Path::new("/pkg"));
        assert_eq!(cmd.command_line, "tsup --watch");
        assert_eq!(cmd.env.get("NODE_ENV").map(String::as_str), Some("development"));
        assert!(!cmd.stderr_filter.is_empty());
    }

    #[test]
    fn mode_variable_overrides_extra_env() {
        let mut build = BuildSection::default();
        build.env.insert("NODE_ENV".into(), "production".into());
        build.env.insert("FORCE_COLOR".into(), "1".into());
        let cmd = BuildCommand::from_config(&build, Path::new("/pkg"));
        assert_eq!(cmd.env.get("NODE_ENV").map(String::as_str), Some("development"));
        assert_eq!(cmd.env.get("FORCE_COLOR").map(String::as_str), Some("1"));
    }

    #[test]
    fn status_tracks_exit() {
        let status = ProcessStatus::new();
        assert!(status.is_alive());
        status.request_kill();
        status.mark_exited(Some(143));
        assert!(!status.is_alive());
        assert!(status.kill_requested());
        assert_eq!(status.exit_code(), Some(143));
    }
}
