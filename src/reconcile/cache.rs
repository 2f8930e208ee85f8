// src/reconcile/cache.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::is_not_found;
use crate::fs::FileSystem;

/// What [`CacheInvalidator::invalidate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Removed,
    Absent,
    Failed,
}

/// Deletes the build tool's incremental cache file.
///
/// The file's format belongs to the build tool; it is never read here, only
/// removed wholesale.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl CacheInvalidator {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn invalidate(&self) -> CacheOutcome {
        match self.fs.remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "invalidated incremental build cache");
                CacheOutcome::Removed
            }
            Err(err) if is_not_found(&err) => {
                debug!(path = %self.path.display(), "no incremental build cache to invalidate");
                CacheOutcome::Absent
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to invalidate incremental build cache");
                CacheOutcome::Failed
            }
        }
    }
}
