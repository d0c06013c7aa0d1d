// src/fs/mod.rs

//! Filesystem access used to discover directories to watch.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn is_dir(&self, path: &Path) -> bool;

    /// True for symbolic links, without following them.
    fn is_symlink(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Real (non-symlink) subdirectories directly inside `path`, sorted.
    fn subdirs(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = self
            .read_dir(path)?
            .into_iter()
            .filter(|p| !self.is_symlink(p) && self.is_dir(p))
            .collect();
        dirs.sort();
        Ok(dirs)
    }
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}
