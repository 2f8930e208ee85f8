// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEntry {
    File,
    Dir,
}

/// In-memory tree for tests.
///
/// Paths are stored exactly as given (no normalisation), so tests should use
/// one consistent style, e.g. `/src/a.ts`. Parent directories are created
/// implicitly. Removals of paths registered with [`fail_removal`] fail with
/// `PermissionDenied`.
///
/// [`fail_removal`]: MockFileSystem::fail_removal
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

fn not_found(path: &Path) -> anyhow::Error {
    anyhow::Error::new(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such entry: {:?}", path),
    ))
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut entries, parent);
        }
        entries.insert(path.to_path_buf(), MockEntry::File);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.entries.lock().unwrap();
        Self::ensure_dirs(&mut entries, path.as_ref());
    }

    /// Make every removal of exactly `path` fail with `PermissionDenied`.
    pub fn fail_removal(&self, path: impl AsRef<Path>) {
        self.failing
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf());
    }

    /// All file paths currently present, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .filter(|(_, e)| **e == MockEntry::File)
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn ensure_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, dir: &Path) {
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }

    fn check_failure(&self, path: &Path) -> Result<()> {
        if self.failing.lock().unwrap().contains(path) {
            return Err(anyhow::Error::new(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("injected failure for {:?}", path),
            )));
        }
        Ok(())
    }

    fn children_of(entries: &BTreeMap<PathBuf, MockEntry>, dir: &Path) -> Vec<PathBuf> {
        entries
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.entries.lock().unwrap().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries.lock().unwrap().get(path), Some(MockEntry::File))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries.lock().unwrap().get(path), Some(MockEntry::Dir))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Paths in the mock are already absolute and symlink-free.
        if self.exists(path) {
            Ok(path.to_path_buf())
        } else {
            Err(not_found(path))
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir) => Ok(Self::children_of(&entries, path)),
            Some(MockEntry::File) => Err(anyhow!("Not a directory: {:?}", path)),
            None => Err(not_found(path)),
        }
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.check_failure(path)?;
        let mut entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File) => {
                entries.remove(path);
                Ok(())
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(not_found(path)),
        }
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        self.check_failure(path)?;
        let mut entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir) => {
                if !Self::children_of(&entries, path).is_empty() {
                    return Err(anyhow!("Directory not empty: {:?}", path));
                }
                entries.remove(path);
                Ok(())
            }
            Some(MockEntry::File) => Err(anyhow!("Not a directory: {:?}", path)),
            None => Err(not_found(path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.check_failure(path)?;
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(path) {
            return Err(not_found(path));
        }
        entries.retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::is_not_found;

    #[test]
    fn parents_are_created_implicitly() {
        let fs = MockFileSystem::new();
        fs.add_file("/out/nested/a.js");
        assert!(fs.is_dir(Path::new("/out/nested")));
        assert_eq!(
            fs.read_dir(Path::new("/out")).unwrap(),
            vec![PathBuf::from("/out/nested")]
        );
    }

    #[test]
    fn missing_entries_report_not_found() {
        let fs = MockFileSystem::new();
        let err = fs.remove_file(Path::new("/nope.js")).unwrap_err();
        assert!(is_not_found(&err));
    }

    #[test]
    fn remove_dir_refuses_non_empty() {
        let fs = MockFileSystem::new();
        fs.add_file("/out/d/a.js");
        assert!(fs.remove_dir(Path::new("/out/d")).is_err());
        fs.remove_dir_all(Path::new("/out/d")).unwrap();
        assert!(!fs.exists(Path::new("/out/d/a.js")));
    }
}
