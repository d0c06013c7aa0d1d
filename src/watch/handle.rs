// src/watch/handle.rs

//! Watch handles and their stop signal.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Keeps a kernel-side registration alive until dropped.
pub type RegistrationGuard = Box<dyn Any + Send>;

/// One directory watch.
///
/// Cloning is cheap; all clones refer to the same registration. [`stop`]
/// releases the registration and signals the owning watch loop exactly once,
/// no matter how many times or from how many clones it is called.
///
/// [`stop`]: WatchHandle::stop
#[derive(Clone)]
pub struct WatchHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: u64,
    path: PathBuf,
    stopped: AtomicBool,
    stop_tx: watch::Sender<bool>,
    guard: Mutex<Option<RegistrationGuard>>,
}

impl WatchHandle {
    /// Wrap a registration. The returned [`StopSignal`] belongs to the loop
    /// that consumes this directory's events.
    pub fn new(path: impl Into<PathBuf>, guard: RegistrationGuard) -> (Self, StopSignal) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = Self {
            inner: Arc::new(HandleInner {
                id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
                path: path.into(),
                stopped: AtomicBool::new(false),
                stop_tx,
                guard: Mutex::new(Some(guard)),
            }),
        };
        (handle, StopSignal { rx: stop_rx })
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Stop the watch. Returns `true` only for the call that actually
    /// stopped it.
    pub fn stop(&self) -> bool {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        let guard = self
            .inner
            .guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(guard);
        self.inner.stop_tx.send_replace(true);
        true
    }
}

impl PartialEq for WatchHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for WatchHandle {}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.inner.id)
            .field("path", &self.inner.path)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Receiving side of a handle's stop notification.
///
/// Dropping every clone of the handle counts as a stop as well.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the handle is stopped or dropped.
    pub async fn stopped(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
