// src/watch/path_utils.rs

//! Utility functions for relating event paths to the watched root.

use std::path::{Path, PathBuf};

/// Express `path` relative to `root`.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (symlinked roots, `/private/var` vs `/var` on macOS), we
///   canonicalize both and try again. A removed path cannot be
///   canonicalized, so for those we canonicalize its parent and re-attach the
///   file name.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_path(root: &Path, path: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_path_buf());
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = canonicalize_lenient(path)?;
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(Path::to_path_buf)
}

/// Same as [`relative_path`] but rendered with forward slashes, which is the
/// form glob patterns are matched against.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    relative_path(root, path).map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    if let Ok(canon) = path.canonicalize() {
        return Some(canon);
    }
    let name = path.file_name()?;
    let parent = path.parent()?.canonicalize().ok()?;
    Some(parent.join(name))
}
