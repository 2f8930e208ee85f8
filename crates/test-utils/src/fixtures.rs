use std::fs;
use std::path::{Path, PathBuf};

use distwatch::config::ResolvedPaths;
use tempfile::TempDir;

/// A throwaway package directory with `src/`, `dist/`, `dist/dts/` and a
/// `.tsbuildinfo` cache path.
pub struct TreeFixture {
    dir: TempDir,
}

impl TreeFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(dir.path().join("src")).expect("create src");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Conventional layout, with the source root canonicalized the same way
    /// the binary does it.
    pub fn paths(&self) -> ResolvedPaths {
        let root = self.dir.path().canonicalize().expect("canonicalize temp dir");
        ResolvedPaths {
            source_root: root.join("src"),
            output_root: root.join("dist"),
            declaration_root: Some(root.join("dist/dts")),
            cache_file: root.join(".tsbuildinfo"),
        }
    }

    /// Create a file (and its parents) with some content.
    pub fn write(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, format!("// {rel}\n")).expect("write file");
        path
    }

    pub fn write_all(&self, rels: &[&str]) {
        for rel in rels {
            self.write(rel);
        }
    }

    pub fn remove(&self, rel: &str) {
        let path = self.path(rel);
        if path.is_dir() {
            fs::remove_dir_all(&path).expect("remove dir");
        } else {
            fs::remove_file(&path).expect("remove file");
        }
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).symlink_metadata().is_ok()
    }

    /// Every file under `rel`, relative to it, with forward slashes, sorted.
    pub fn files_under(&self, rel: &str) -> Vec<String> {
        let base = self.path(rel);
        let mut out = Vec::new();
        let mut stack = vec![base.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&base) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        out
    }
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}
