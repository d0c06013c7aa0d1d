// src/watch/registry.rs

//! Process-wide map from watched directory to its [`WatchHandle`].
//!
//! Every watch loop mutates the registry, so all access goes through one
//! mutex. A path that is not in the registry has no active watch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::watch::handle::WatchHandle;

/// Result of [`WatchRegistry::insert_new`].
#[derive(Debug)]
pub enum Insertion<T> {
    /// `create` ran and its handle is now registered.
    Added(WatchHandle, T),
    /// The path was already registered; `create` did not run.
    Exists,
    /// The registry holds `limit` watches; `create` did not run.
    Full,
}

#[derive(Debug, Clone, Default)]
pub struct WatchRegistry {
    inner: Arc<Mutex<HashMap<PathBuf, WatchHandle>>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<PathBuf, WatchHandle>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `handle` for `path`, stopping any handle it replaces.
    pub fn register(&self, path: impl Into<PathBuf>, handle: WatchHandle) {
        let path = path.into();
        let replaced = self.map().insert(path.clone(), handle);
        if let Some(old) = replaced {
            debug!(path = %path.display(), old_id = old.id(), "replaced existing watch");
            old.stop();
        }
    }

    /// Register a new watch for `path` unless one exists or `limit` is
    /// reached.
    ///
    /// The lock is held while `create` runs, so concurrent callers for the
    /// same path create at most one watch between them.
    pub fn insert_new<T, E>(
        &self,
        path: &Path,
        limit: Option<usize>,
        create: impl FnOnce() -> Result<(WatchHandle, T), E>,
    ) -> Result<Insertion<T>, E> {
        let mut map = self.map();
        if map.contains_key(path) {
            return Ok(Insertion::Exists);
        }
        if limit.is_some_and(|max| map.len() >= max) {
            return Ok(Insertion::Full);
        }

        let (handle, extra) = create()?;
        map.insert(path.to_path_buf(), handle.clone());
        Ok(Insertion::Added(handle, extra))
    }

    /// Remove and stop the watch for `path` and for every registered
    /// directory below it. Returns how many watches were removed; removing
    /// an unknown path is a no-op.
    pub fn unregister(&self, path: &Path) -> usize {
        let removed: Vec<(PathBuf, WatchHandle)> = {
            let mut map = self.map();
            let doomed: Vec<PathBuf> = map
                .keys()
                .filter(|p| p.starts_with(path))
                .cloned()
                .collect();
            doomed
                .into_iter()
                .filter_map(|p| map.remove(&p).map(|h| (p, h)))
                .collect()
        };

        // Stop outside the lock; dropping a registration may block briefly.
        for (p, handle) in &removed {
            handle.stop();
            info!(path = %p.display(), "dir watcher removed");
        }
        removed.len()
    }

    pub fn lookup(&self, path: &Path) -> Option<WatchHandle> {
        self.map().get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.map().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// All watched paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.map().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(path: &str) -> WatchHandle {
        WatchHandle::new(path, Box::new(())).0
    }

    fn created(path: &'static str) -> impl FnOnce() -> Result<(WatchHandle, ()), ()> {
        move || Ok((handle(path), ()))
    }

    #[test]
    fn register_lookup_unregister() {
        let registry = WatchRegistry::new();
        let h = handle("/a");

        registry.register("/a", h.clone());
        assert_eq!(registry.lookup(Path::new("/a")), Some(h.clone()));

        assert_eq!(registry.unregister(Path::new("/a")), 1);
        assert!(registry.lookup(Path::new("/a")).is_none());
        assert!(h.is_stopped());

        // Second removal is a no-op.
        assert_eq!(registry.unregister(Path::new("/a")), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn register_replaces_and_stops_previous() {
        let registry = WatchRegistry::new();
        let first = handle("/a");
        let second = handle("/a");

        registry.register("/a", first.clone());
        registry.register("/a", second.clone());

        assert!(first.is_stopped());
        assert!(!second.is_stopped());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(Path::new("/a")), Some(second));
    }

    #[test]
    fn insert_new_skips_existing_paths_and_honours_the_limit() {
        let registry = WatchRegistry::new();

        assert!(matches!(
            registry.insert_new(Path::new("/a"), Some(2), created("/a")),
            Ok(Insertion::Added(..))
        ));
        assert!(matches!(
            registry.insert_new(Path::new("/a"), Some(2), || -> Result<(WatchHandle, ()), ()> {
                panic!("must not create a second watch")
            }),
            Ok(Insertion::Exists)
        ));
        assert!(matches!(
            registry.insert_new(Path::new("/b"), Some(2), created("/b")),
            Ok(Insertion::Added(..))
        ));
        assert!(matches!(
            registry.insert_new(Path::new("/c"), Some(2), created("/c")),
            Ok(Insertion::Full)
        ));
        assert!(matches!(
            registry.insert_new(Path::new("/c"), None, || Err::<(WatchHandle, ()), _>("boom")),
            Err("boom")
        ));
        assert_eq!(registry.paths(), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn concurrent_insert_new_creates_one_watch_per_path() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Barrier;

        let registry = WatchRegistry::new();
        let creations = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let creations = Arc::clone(&creations);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry
                        .insert_new(Path::new("/w/x"), None, || {
                            creations.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, ()>((handle("/w/x"), ()))
                        })
                        .unwrap()
                })
            })
            .collect();

        let added = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|outcome| matches!(outcome, Insertion::Added(..)))
            .count();
        assert_eq!(added, 1);
        assert_eq!(creations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_cascades_to_descendants_only() {
        let registry = WatchRegistry::new();
        let parent = handle("/w/a");
        let child = handle("/w/a/b");
        let grandchild = handle("/w/a/b/c");
        let sibling = handle("/w/ab");

        registry.register("/w/a", parent.clone());
        registry.register("/w/a/b", child.clone());
        registry.register("/w/a/b/c", grandchild.clone());
        registry.register("/w/ab", sibling.clone());

        assert_eq!(registry.unregister(Path::new("/w/a")), 3);
        assert!(parent.is_stopped() && child.is_stopped() && grandchild.is_stopped());
        assert!(!sibling.is_stopped());
        assert_eq!(registry.paths(), vec![PathBuf::from("/w/ab")]);
    }

    #[test]
    fn concurrent_registration_keeps_one_handle_per_path() {
        let registry = WatchRegistry::new();
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let path = format!("/w/{}", j % 10);
                        registry.register(path.clone(), handle(&path));
                        if (i + j) % 3 == 0 {
                            registry.unregister(Path::new(&path));
                        }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        for path in registry.paths() {
            let live = registry.lookup(&path).unwrap();
            assert!(!live.is_stopped());
        }
        assert!(registry.len() <= 10);
    }
}
