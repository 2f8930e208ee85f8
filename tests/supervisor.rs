// tests/supervisor.rs

use std::time::Duration;

use distwatch::exec::BuildSupervisor;
use distwatch_test_utils::fake_launcher::FakeLauncher;
use distwatch_test_utils::{eventually, init_tracing, with_timeout};

#[tokio::test]
async fn rapid_restarts_leave_exactly_one_live_process() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let mut supervisor = BuildSupervisor::new(launcher.clone());

    for i in 0..10 {
        supervisor.restart(&format!("file added: /pkg/src/{i}.ts")).unwrap();
    }

    assert_eq!(launcher.launch_count(), 10);
    eventually("older processes to exit", || launcher.live_count() == 1).await;

    let launches = launcher.launches();
    let (last, older) = launches.split_last().unwrap();
    assert!(older.iter().all(|r| r.status.kill_requested()));
    assert!(!last.status.kill_requested());
    assert_eq!(last.generation, 10);
    assert_eq!(supervisor.current().map(|p| p.generation()), Some(10));
}

#[tokio::test]
async fn failed_spawn_records_nothing_and_next_restart_recovers() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let mut supervisor = BuildSupervisor::new(launcher.clone());

    supervisor.restart("initial build").unwrap();
    launcher.fail_next_launches(1);

    assert!(supervisor.restart("file added: /pkg/src/d.ts").is_err());
    assert!(supervisor.current().is_none());
    assert!(!supervisor.is_alive());
    eventually("the killed process to exit", || launcher.live_count() == 0).await;

    let generation = supervisor.restart("file added: /pkg/src/e.ts").unwrap();
    assert_eq!(generation, 2);
    assert!(supervisor.is_alive());
}

#[tokio::test]
async fn stop_waits_for_every_killed_process() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let mut supervisor = BuildSupervisor::new(launcher.clone());

    supervisor.restart("initial build").unwrap();
    supervisor.restart("file added: /pkg/src/d.ts").unwrap();
    with_timeout(supervisor.stop(Duration::from_secs(2))).await;

    assert_eq!(launcher.live_count(), 0);
    assert!(supervisor.current().is_none());
    assert!(!supervisor.kill());
}

#[tokio::test]
async fn self_exited_process_is_not_alive() {
    init_tracing();
    let launcher = FakeLauncher::new();
    let mut supervisor = BuildSupervisor::new(launcher.clone());

    supervisor.restart("initial build").unwrap();
    launcher.exit_latest(1);

    assert!(!supervisor.is_alive());
    // Still recorded until the next restart replaces it.
    assert!(supervisor.current().is_some());
    supervisor.restart("file added: /pkg/src/d.ts").unwrap();
    assert!(supervisor.is_alive());
}

#[cfg(unix)]
mod shell {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use distwatch::exec::{BuildCommand, ShellLauncher, StderrFilter};
    use tempfile::tempdir;

    use super::*;

    fn launcher(line: &str, dir: &std::path::Path) -> ShellLauncher {
        ShellLauncher::new(BuildCommand {
            command_line: line.to_string(),
            env: BTreeMap::from([("NODE_ENV".to_string(), "development".to_string())]),
            working_dir: dir.to_path_buf(),
            stderr_filter: Arc::new(StderrFilter::new::<&str>(&[])),
        })
    }

    #[tokio::test]
    async fn restart_kills_the_running_shell_process() {
        init_tracing();
        let dir = tempdir().unwrap();
        let mut supervisor = BuildSupervisor::new(launcher("sleep 30", dir.path()));

        supervisor.restart("initial build").unwrap();
        assert!(supervisor.current().and_then(|p| p.pid()).is_some());
        assert!(supervisor.is_alive());

        supervisor.restart("file added: src/d.ts").unwrap();
        assert_eq!(supervisor.current().map(|p| p.generation()), Some(2));

        with_timeout(supervisor.stop(Duration::from_secs(3))).await;
        assert!(!supervisor.is_alive());
    }

    #[tokio::test]
    async fn failing_build_exits_without_restarting() {
        init_tracing();
        let dir = tempdir().unwrap();
        let mut supervisor = BuildSupervisor::new(launcher("sh -c 'exit 3'", dir.path()));

        supervisor.restart("initial build").unwrap();
        eventually("the build to exit", || !supervisor.is_alive()).await;
        assert_eq!(supervisor.current().map(|p| p.generation()), Some(1));
    }

    #[tokio::test]
    async fn mode_variable_reaches_the_child() {
        init_tracing();
        let dir = tempdir().unwrap();
        let marker = dir.path().join("mode.txt");
        let line = format!("sh -c 'printf %s \"$NODE_ENV\" > {}'", marker.display());
        let mut supervisor = BuildSupervisor::new(launcher(&line, dir.path()));

        supervisor.restart("initial build").unwrap();
        eventually("the build to exit", || !supervisor.is_alive()).await;
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "development");
    }
}
