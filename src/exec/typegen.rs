// src/exec/typegen.rs

//! Optional one-shot declaration generator run before each restart.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::backend::shell_command;

/// Runs `build.typegen_cmd` in the background.
///
/// Only the newest invocation matters: starting a new one aborts the
/// previous task, and dropping its child kills the process.
#[derive(Debug)]
pub struct TypegenRunner {
    cmd: Option<String>,
    env: BTreeMap<String, String>,
    working_dir: PathBuf,
    current: Option<JoinHandle<()>>,
    runs: u64,
}

impl TypegenRunner {
    pub fn new(cmd: Option<String>, env: BTreeMap<String, String>, working_dir: PathBuf) -> Self {
        Self {
            cmd,
            env,
            working_dir,
            current: None,
            runs: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, BTreeMap::new(), PathBuf::from("."))
    }

    pub fn is_enabled(&self) -> bool {
        self.cmd.is_some()
    }

    /// Start a run. Returns false when no command is configured.
    pub fn run(&mut self) -> bool {
        let Some(line) = self.cmd.clone() else {
            return false;
        };

        self.abort();
        self.runs += 1;
        let run = self.runs;

        let mut cmd = shell_command(&line, false);
        cmd.current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        self.current = Some(tokio::spawn(async move {
            info!(run, cmd = %line, "regenerating type declarations");
            match cmd.status().await {
                Ok(status) if status.success() => {
                    info!(run, "type declarations regenerated");
                }
                Ok(status) => {
                    warn!(run, exit_code = ?status.code(), "type generation failed");
                }
                Err(e) => {
                    warn!(run, error = %e, "failed to start type generation");
                }
            }
        }));
        true
    }

    /// Abort a still-running invocation, if any.
    pub fn abort(&mut self) {
        if let Some(handle) = self.current.take() {
            if !handle.is_finished() {
                debug!("aborting previous type generation run");
            }
            handle.abort();
        }
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

impl Drop for TypegenRunner {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_runner_does_nothing() {
        let mut runner = TypegenRunner::disabled();
        assert!(!runner.is_enabled());
        assert!(!runner.run());
        assert_eq!(runner.runs(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn newer_run_replaces_older() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = TypegenRunner::new(
            Some("sleep 5".into()),
            BTreeMap::new(),
            dir.path().to_path_buf(),
        );
        assert!(runner.run());
        assert!(runner.run());
        assert_eq!(runner.runs(), 2);
        runner.abort();
    }
}
