// src/watch/inotify_source.rs

//! Linux source: one inotify instance shared by every directory watch.
//!
//! `open` adds a watch descriptor to the shared instance and records a route
//! from the descriptor to the directory's channels. A single reader thread
//! reads kernel records and forwards each one, with its raw mask, to the route
//! of the descriptor it arrived on. Records for a subdirectory seen by the
//! parent (with a name) and by the subdirectory's own watch (without one) stay
//! distinct, exactly as the kernel reports them.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask, Watches};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::errors::{FwatcherError, Result};
use crate::events::flags::{IN_IGNORED, IN_Q_OVERFLOW};
use crate::watch::source::{RawChangeEvent, SourceStream, WatchSource};

const READ_BUFFER_SIZE: usize = 64 * 1024;

static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(1);

/// Production source on Linux.
///
/// Cloning shares the instance. The reader thread exits after the next
/// kernel record once every clone is gone.
#[derive(Debug, Clone)]
pub struct InotifySource {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    watches: Watches,
    routes: Mutex<HashMap<i32, Route>>,
}

#[derive(Debug)]
struct Route {
    id: u64,
    dir: PathBuf,
    wd: WatchDescriptor,
    events: mpsc::UnboundedSender<RawChangeEvent>,
    errors: mpsc::UnboundedSender<FwatcherError>,
}

impl InotifySource {
    pub fn new() -> Result<Self> {
        let inotify = Inotify::init()?;
        let shared = Arc::new(Shared {
            watches: inotify.watches(),
            routes: Mutex::new(HashMap::new()),
        });

        let weak = Arc::downgrade(&shared);
        thread::Builder::new()
            .name("fwatcher-inotify".to_string())
            .spawn(move || read_loop(inotify, weak))?;

        Ok(Self { shared })
    }

    /// Number of directories currently routed.
    pub fn watch_count(&self) -> usize {
        self.shared.routes().len()
    }
}

impl Shared {
    fn routes(&self) -> MutexGuard<'_, HashMap<i32, Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, wd: &WatchDescriptor, mask: EventMask, name: Option<&OsStr>) {
        let mask = mask.bits();

        if mask & IN_Q_OVERFLOW != 0 {
            for route in self.routes().values() {
                let _ = route.events.send(RawChangeEvent::new(&route.dir, IN_Q_OVERFLOW, 0));
            }
            return;
        }

        let mut routes = self.routes();
        let id = wd.get_watch_descriptor_id();
        let Some(route) = routes.get(&id) else {
            trace!(wd = id, mask, "record for unknown watch");
            return;
        };

        let event = match name {
            Some(name) => RawChangeEvent::for_watch(&route.dir, route.dir.join(name), mask),
            None => RawChangeEvent::new(&route.dir, mask, 0),
        };
        let _ = route.events.send(event);

        // The kernel dropped the watch (directory gone or unwatched); closing
        // the channels ends the directory's loop.
        if mask & IN_IGNORED != 0 {
            if let Some(route) = routes.remove(&id) {
                debug!(dir = %route.dir.display(), "kernel watch removed");
            }
        }
    }

    fn broadcast_error(&self, err: &io::Error) {
        for route in self.routes().values() {
            let copy = io::Error::new(err.kind(), err.to_string());
            let _ = route.errors.send(FwatcherError::IoError(copy));
        }
    }
}

fn read_loop(mut inotify: Inotify, shared: Weak<Shared>) {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let events = match inotify.read_events_blocking(&mut buffer) {
            Ok(events) => events,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let Some(shared) = shared.upgrade() else { return };
                warn!(error = %err, "reading inotify records failed");
                shared.broadcast_error(&err);
                thread::sleep(Duration::from_millis(100));
                continue;
            }
        };

        let Some(shared) = shared.upgrade() else { return };
        for event in events {
            shared.dispatch(&event.wd, event.mask, event.name);
        }
    }
}

/// Keeps one route alive; dropping it removes the kernel watch.
struct InotifyRegistration {
    id: u64,
    wd_id: i32,
    shared: Arc<Shared>,
}

impl Drop for InotifyRegistration {
    fn drop(&mut self) {
        let mut routes = self.shared.routes();
        // A later `open` of the same inode reuses the descriptor and takes the
        // route over; that watch must survive.
        if routes.get(&self.wd_id).is_none_or(|route| route.id != self.id) {
            return;
        }
        if let Some(route) = routes.remove(&self.wd_id) {
            if let Err(err) = self.shared.watches.clone().remove(route.wd) {
                debug!(dir = %route.dir.display(), error = %err, "watch already gone");
            }
        }
    }
}

impl WatchSource for InotifySource {
    fn open(&self, dir: &Path, mask: u32) -> Result<SourceStream> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        // Held across the add so no record for the new descriptor is read
        // before its route exists.
        let mut routes = self.shared.routes();
        let wd = self
            .shared
            .watches
            .clone()
            .add(dir, WatchMask::from_bits_retain(mask))?;

        let wd_id = wd.get_watch_descriptor_id();
        let id = NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed);
        let replaced = routes.insert(
            wd_id,
            Route {
                id,
                dir: dir.to_path_buf(),
                wd,
                events: event_tx,
                errors: error_tx,
            },
        );
        drop(routes);

        if let Some(old) = replaced {
            debug!(old = %old.dir.display(), new = %dir.display(), wd = wd_id, "watch descriptor reused");
        }

        Ok(SourceStream {
            events: event_rx,
            errors: error_rx,
            guard: Box::new(InotifyRegistration {
                id,
                wd_id,
                shared: Arc::clone(&self.shared),
            }),
        })
    }
}
