// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::event_handler::classify;
use crate::watch::known::KnownFiles;
use crate::watch::patterns::WatchFilter;
use crate::watch::settle::WriteSettler;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop watching and wait for the forwarding task to finish.
    pub async fn shutdown(self) {
        let WatcherHandle { _inner, task } = self;
        drop(_inner);
        if let Err(e) = task.await {
            debug!(error = %e, "watcher task ended abnormally");
        }
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes the source root recursively and
/// sends settled, classified `RuntimeEvent::Watch` events into the runtime.
///
/// - `filter` holds the source root and the include/exclude globs.
/// - `stability` is how long a path must stay quiet before its event is
///   forwarded.
/// - `runtime_tx` is the channel into the main runtime. `WatcherReady` is
///   sent once registration has finished, before any watch event.
pub fn spawn_watcher(
    filter: WatchFilter,
    stability: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root: PathBuf = filter.root().to_path_buf();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Err(err) = event_tx.send(res) {
                // We can't log via tracing here easily, so fallback to stderr.
                eprintln!("distwatch: failed to forward notify event: {err}");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {}", root.display()))?;

    info!(root = %root.display(), "file watcher started");

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let task = tokio::spawn(forward_events(filter, stability, fs, event_rx, runtime_tx));

    Ok(WatcherHandle {
        _inner: watcher,
        task,
    })
}

/// Consume notify events, classify them, hold them in the write-stability
/// window and forward them once settled.
pub async fn forward_events(
    filter: WatchFilter,
    stability: Duration,
    fs: Arc<dyn FileSystem>,
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let mut known = index_sources(&fs, &filter).await;
    if runtime_tx.send(RuntimeEvent::WatcherReady).await.is_err() {
        return;
    }

    let mut settler = WriteSettler::new(stability);

    loop {
        let deadline = settler.next_deadline();
        tokio::select! {
            // Drain queued raw events before releasing anything.
            biased;

            maybe = event_rx.recv() => {
                let Some(res) = maybe else {
                    break;
                };
                let outbound = match res {
                    Ok(event) => {
                        debug!(?event, "received notify event");
                        let classified = classify(&event, &filter, |p| fs.kind_of(p));
                        if classified.rescan {
                            known = index_sources(&fs, &filter).await;
                        }
                        let events = known.apply(classified.events, fs.as_ref(), &filter);
                        let now = Instant::now();
                        for watch_event in events {
                            settler.offer(watch_event, now);
                        }
                        classified.rescan.then(|| RuntimeEvent::RescanRequired {
                            path: event.paths.first().cloned(),
                        })
                    }
                    Err(err) => {
                        warn!(error = %err, "file watch error");
                        Some(RuntimeEvent::WatcherFault {
                            message: err.to_string(),
                        })
                    }
                };
                if let Some(ev) = outbound {
                    if runtime_tx.send(ev).await.is_err() {
                        break;
                    }
                }
            }
            () = wait_until(deadline) => {
                for watch_event in settler.drain_due(Instant::now()) {
                    if runtime_tx.send(RuntimeEvent::Watch(watch_event)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    // Flush what is still settling so nothing observed is lost.
    for watch_event in settler.drain_due(Instant::now() + stability) {
        if runtime_tx.send(RuntimeEvent::Watch(watch_event)).await.is_err() {
            break;
        }
    }
    debug!("watcher event loop finished");
}

/// Index the source files currently on disk.
async fn index_sources(fs: &Arc<dyn FileSystem>, filter: &WatchFilter) -> KnownFiles {
    let fs = Arc::clone(fs);
    let filter = filter.clone();
    tokio::task::spawn_blocking(move || KnownFiles::scan(fs.as_ref(), &filter))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "indexing source files failed");
            KnownFiles::default()
        })
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}
