// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod reconcile;
pub mod types;
pub mod watch;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile, ResolvedPaths};
use crate::engine::{spawn_signal_listener, CoreOptions, CoreRuntime, Runtime, RuntimeEvent};
use crate::errors::DistwatchError;
use crate::exec::{BuildCommand, BuildSupervisor, ShellLauncher, TypegenRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::reconcile::{CacheInvalidator, ExtensionMap, Reconciler};
use crate::watch::{spawn_watcher, WatchFilter};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and path resolution
/// - reconciler / cache invalidator
/// - build supervisor and optional type generator
/// - file watcher (disabled in `--clean` mode)
/// - SIGINT / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_deref().map(Path::new);
    let cfg = load_or_default(config_path)?;
    let base_dir = config_root_dir(config_path)?;
    let mut paths = cfg.paths.resolve(&base_dir);

    if args.dry_run {
        print_dry_run(&cfg, &paths, &base_dir);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    // Canonicalize once so watcher event paths relate to it directly.
    paths.source_root = resolve_source_root(fs.as_ref(), &paths.source_root)?;

    let reconciler = Arc::new(Reconciler::new(Arc::clone(&fs), &paths, ExtensionMap::default()));
    let cache = CacheInvalidator::new(Arc::clone(&fs), &paths.cache_file);

    if args.clean {
        return clean_once(&reconciler, &cache);
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);

    let filter = WatchFilter::from_config(&paths.source_root, &cfg.watch)?;
    let _watcher = spawn_watcher(
        filter,
        Duration::from_millis(cfg.watch.stability_ms),
        rt_tx.clone(),
    )?;

    spawn_signal_listener(rt_tx);

    let command = BuildCommand::from_config(&cfg.build, &base_dir);
    let typegen = TypegenRunner::new(
        cfg.build.typegen_cmd.clone(),
        command.env.clone(),
        base_dir.clone(),
    );
    let supervisor = BuildSupervisor::new(ShellLauncher::new(command));

    let options = CoreOptions::from_config(&cfg.watch, typegen.is_enabled());

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(options);

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, supervisor, reconciler, cache)
        .with_typegen(typegen)
        .with_shutdown_timeout(Duration::from_millis(cfg.watch.shutdown_timeout_ms));
    runtime.run().await?;
    Ok(())
}

/// Drive `fut` to completion on a fresh multi-threaded runtime, then give
/// leftover tasks at most `grace` to finish.
///
/// A blocking reconcile pass that outlived the shutdown timeout would
/// otherwise hold the process open when the runtime is dropped.
pub fn block_on_bounded<F: Future>(fut: F, grace: Duration) -> Result<F::Output> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let output = rt.block_on(fut);
    rt.shutdown_timeout(grace);
    Ok(output)
}

/// Canonical form of the source root; it must exist and be a directory.
fn resolve_source_root(
    fs: &dyn FileSystem,
    path: &Path,
) -> std::result::Result<PathBuf, DistwatchError> {
    match fs.canonicalize(path) {
        Ok(root) if fs.is_dir(&root) => Ok(root),
        _ => Err(DistwatchError::SourceRootMissing(path.to_path_buf())),
    }
}

/// One full reconciliation plus cache invalidation, for `--clean`.
fn clean_once(reconciler: &Reconciler, cache: &CacheInvalidator) -> Result<()> {
    let report = reconciler.reconcile_all()?;
    for failure in &report.failures {
        warn!(path = %failure.path.display(), error = %failure.error, "could not remove");
    }
    info!(
        removed = report.removed.len(),
        pruned = report.pruned.len(),
        failed = report.failures.len(),
        "clean finished"
    );
    cache.invalidate();
    Ok(())
}

/// Figure out the directory relative paths in the config resolve against.
///
/// - If the config path has a non-empty parent (e.g. "configs/Distwatch.toml"),
///   we use that directory.
/// - Otherwise (bare filename or no config at all) we use the current working
///   directory.
fn config_root_dir(config_path: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let dir = match config_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd,
    };
    Ok(dir)
}

/// Simple dry-run output: print roots, command and timings.
fn print_dry_run(cfg: &ConfigFile, paths: &ResolvedPaths, base_dir: &Path) {
    println!("distwatch dry-run");
    println!("  working dir = {}", base_dir.display());
    println!();

    println!("paths:");
    println!("  source       = {}", paths.source_root.display());
    println!("  output       = {}", paths.output_root.display());
    match &paths.declaration_root {
        Some(dts) => println!("  declarations = {}", dts.display()),
        None => println!("  declarations = (none)"),
    }
    println!("  cache_file   = {}", paths.cache_file.display());
    println!();

    println!("build:");
    println!("  cmd: {}", cfg.build.command_line());
    println!("  env: {}={}", cfg.build.mode_var, cfg.build.mode);
    for (key, value) in &cfg.build.env {
        println!("       {key}={value}");
    }
    if let Some(ref typegen) = cfg.build.typegen_cmd {
        println!("  typegen: {typegen}");
    }
    if !cfg.build.suppress_stderr.is_empty() {
        println!("  suppress_stderr: {:?}", cfg.build.suppress_stderr);
    }
    println!();

    println!("watch:");
    println!("  include: {:?}", cfg.watch.include);
    println!("  exclude: {:?}", cfg.watch.exclude);
    println!("  quiet_period_ms: {}", cfg.watch.quiet_period_ms);
    println!("  stability_ms: {}", cfg.watch.stability_ms);
    println!("  restart_on_remove: {}", cfg.watch.restart_on_remove);
    println!("  reconcile_on_startup: {}", cfg.watch.reconcile_on_startup);
    println!("  shutdown_timeout_ms: {}", cfg.watch.shutdown_timeout_ms);

    debug!("dry-run complete (no execution)");
}
