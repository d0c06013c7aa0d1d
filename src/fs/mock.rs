// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir(Vec<String>), // List of child names
    Symlink,
}

/// In-memory directory tree for tests. Paths are used as given; tests use
/// absolute paths.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Dir(Vec::new()));
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::File);
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Symlink);
    }

    /// Remove `path` and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        entries.retain(|p, _| !p.starts_with(path));
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
                children.retain(|c| c.as_str() != name.to_string_lossy());
            }
        }
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.lock();
        if !matches!(
            (entries.get(path), &entry),
            (Some(MockEntry::Dir(_)), MockEntry::Dir(_))
        ) {
            entries.insert(path.to_path_buf(), entry);
        }
        Self::link_parents(&mut entries, path);
    }

    // Ensure parent directories exist implicitly for simplicity in this mock
    fn link_parents(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let mut child = path;
        while let (Some(parent), Some(name)) = (child.parent(), child.file_name()) {
            let name = name.to_string_lossy().into_owned();
            let entry = entries
                .entry(parent.to_path_buf())
                .or_insert_with(|| MockEntry::Dir(Vec::new()));
            if let MockEntry::Dir(children) = entry {
                if !children.contains(&name) {
                    children.push(name);
                }
            }
            child = parent;
        }
    }
}

impl FileSystem for MockFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Symlink))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdirs_skip_files_and_symlinks() {
        let fs = MockFileSystem::new();
        fs.add_dir("/w/b");
        fs.add_dir("/w/a/deep");
        fs.add_file("/w/file.txt");
        fs.add_symlink("/w/link");

        let dirs = fs.subdirs(Path::new("/w")).unwrap();
        assert_eq!(dirs, vec![PathBuf::from("/w/a"), PathBuf::from("/w/b")]);
        assert!(fs.is_dir(Path::new("/")));
    }

    #[test]
    fn remove_drops_subtree() {
        let fs = MockFileSystem::new();
        fs.add_dir("/w/a/b");
        fs.remove("/w/a");
        assert!(!fs.is_dir(Path::new("/w/a/b")));
        assert!(fs.subdirs(Path::new("/w")).unwrap().is_empty());
        assert!(fs.read_dir(Path::new("/w/a")).is_err());
    }
}
