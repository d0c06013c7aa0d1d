// src/watch/tree.rs

//! Supervisor for the set of per-directory watch loops.
//!
//! The tree owns everything a loop needs (registry, source, dispatcher,
//! filters) and is the only place where handles are created and loops are
//! spawned. Loops call back into it when a directory appears.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{FwatcherError, Result};
use crate::events::filter::EventFilterSet;
use crate::events::flags::{IN_ALL_EVENTS, IN_CLOSE, IN_EXCL_UNLINK, IN_ISDIR, IN_MOVE};
use crate::exec::Dispatcher;
use crate::fs::FileSystem;
use crate::watch::handle::WatchHandle;
use crate::watch::registry::{Insertion, WatchRegistry};
use crate::watch::source::WatchSource;
use crate::watch::watch_loop::WatchLoop;

/// Mask used when none is configured.
pub const DEFAULT_WATCH_MASK: u32 = IN_ALL_EVENTS | IN_ISDIR | IN_CLOSE | IN_MOVE | IN_EXCL_UNLINK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Events requested from the notification source for every directory.
    pub mask: u32,
    /// Upper bound on simultaneously watched directories.
    pub max_watches: Option<usize>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            mask: DEFAULT_WATCH_MASK,
            max_watches: None,
        }
    }
}

/// Result of trying to watch a single directory.
#[derive(Debug)]
pub enum WatchOutcome {
    Added(WatchHandle),
    AlreadyWatched,
    LimitReached,
}

#[derive(Clone)]
pub struct WatchTree {
    ctx: Arc<TreeContext>,
}

struct TreeContext {
    registry: WatchRegistry,
    source: Arc<dyn WatchSource>,
    fs: Arc<dyn FileSystem>,
    dispatcher: Arc<dyn Dispatcher>,
    filters: EventFilterSet,
    options: WatchOptions,
    active_loops: AtomicUsize,
}

impl fmt::Debug for WatchTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchTree")
            .field("watched", &self.ctx.registry.len())
            .field("active_loops", &self.active_loops())
            .field("options", &self.ctx.options)
            .finish_non_exhaustive()
    }
}

impl WatchTree {
    pub fn new(
        source: Arc<dyn WatchSource>,
        fs: Arc<dyn FileSystem>,
        dispatcher: Arc<dyn Dispatcher>,
        filters: EventFilterSet,
        options: WatchOptions,
    ) -> Self {
        Self {
            ctx: Arc::new(TreeContext {
                registry: WatchRegistry::new(),
                source,
                fs,
                dispatcher,
                filters,
                options,
                active_loops: AtomicUsize::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.ctx.registry
    }

    pub fn filters(&self) -> &EventFilterSet {
        &self.ctx.filters
    }

    pub fn options(&self) -> WatchOptions {
        self.ctx.options
    }

    pub(crate) fn dispatcher(&self) -> &dyn Dispatcher {
        self.ctx.dispatcher.as_ref()
    }

    /// Number of watch loops currently running.
    pub fn active_loops(&self) -> usize {
        self.ctx.active_loops.load(Ordering::SeqCst)
    }

    pub(crate) fn loop_started(&self) {
        self.ctx.active_loops.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn loop_finished(&self) {
        self.ctx.active_loops.fetch_sub(1, Ordering::SeqCst);
    }

    /// Watch `root` and every directory that already exists below it.
    ///
    /// Failing to watch the root itself is fatal; failures below it are
    /// logged and those subtrees are skipped. Must be called from within a
    /// Tokio runtime.
    pub fn start(&self, root: &Path) -> Result<WatchHandle> {
        let root_err = |reason: String| FwatcherError::RootWatch {
            path: root.to_path_buf(),
            reason,
        };

        if !self.ctx.fs.is_dir(root) {
            return Err(root_err("not a directory".to_string()));
        }

        let handle = match self.watch_dir(root).map_err(|e| root_err(e.to_string()))? {
            WatchOutcome::Added(handle) => handle,
            WatchOutcome::AlreadyWatched => self
                .registry()
                .lookup(root)
                .ok_or_else(|| root_err("watch vanished while starting".to_string()))?,
            WatchOutcome::LimitReached => return Err(root_err("watch limit reached".to_string())),
        };

        let mut added = 0;
        for sub in self.subdirs(root) {
            added += self.watch_subtree(&sub);
        }
        info!(root = %root.display(), subdirs = added, "initial watches registered");

        Ok(handle)
    }

    /// Watch `dir` and the directories below it that are not yet watched.
    ///
    /// Never fails: a directory that cannot be watched is logged and its
    /// subtree skipped. Returns the number of newly added watches.
    pub fn watch_subtree(&self, dir: &Path) -> usize {
        let mut added = 0;
        let mut pending = vec![dir.to_path_buf()];

        while let Some(next) = pending.pop() {
            match self.watch_dir(&next) {
                Ok(WatchOutcome::Added(_)) => added += 1,
                Ok(WatchOutcome::AlreadyWatched) => {
                    debug!(path = %next.display(), "directory already watched");
                }
                Ok(WatchOutcome::LimitReached) => break,
                Err(err) => {
                    warn!(path = %next.display(), error = %err, "skipping directory");
                    continue;
                }
            }
            let mut subs = self.subdirs(&next);
            subs.reverse();
            pending.extend(subs);
        }

        added
    }

    /// Create, register and start a watch for exactly one directory.
    ///
    /// The existence check, the limit check and the registration happen
    /// under one registry lock, so concurrent calls for the same directory
    /// open a single watch and the rest see `AlreadyWatched`.
    pub fn watch_dir(&self, dir: &Path) -> Result<WatchOutcome> {
        let max_watches = self.ctx.options.max_watches;
        let insertion = self.registry().insert_new(dir, max_watches, || {
            let stream = self
                .ctx
                .source
                .open(dir, self.ctx.options.mask)
                .map_err(|e| FwatcherError::WatchFailed {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                })?;
            let (handle, stop) = WatchHandle::new(dir, stream.guard);
            Ok::<_, FwatcherError>((handle, (stop, stream.events, stream.errors)))
        })?;

        let (handle, (stop, events, errors)) = match insertion {
            Insertion::Added(handle, parts) => (handle, parts),
            Insertion::Exists => return Ok(WatchOutcome::AlreadyWatched),
            Insertion::Full => {
                warn!(path = %dir.display(), max = ?max_watches, "watch limit reached; not watching directory");
                return Ok(WatchOutcome::LimitReached);
            }
        };
        info!(path = %dir.display(), id = handle.id(), "dir watcher added");

        let watch_loop = WatchLoop::new(self.clone(), dir.to_path_buf(), events, errors, stop);
        tokio::spawn(watch_loop.run());

        Ok(WatchOutcome::Added(handle))
    }

    fn subdirs(&self, dir: &Path) -> Vec<PathBuf> {
        self.ctx.fs.subdirs(dir).unwrap_or_else(|err| {
            debug!(path = %dir.display(), error = %err, "could not list directory");
            Vec::new()
        })
    }
}
