// src/watch/source.rs

//! Notification source: one non-recursive kernel watch per directory.
//!
//! A [`WatchSource`] opens a watch on a single directory and hands back a
//! private event channel, a private error channel and a guard that keeps the
//! registration alive. On Linux the production source is
//! `InotifySource`, which reads raw kernel records. [`NotifySource`] is the
//! portable fallback; it uses `notify` and translates each notification back
//! into an inotify-style bitmask so classification works on raw masks.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::errors::{FwatcherError, Result};
use crate::events::flags::{
    IN_ACCESS, IN_ALL_EVENTS, IN_ATTRIB, IN_CLOSE_NOWRITE, IN_CLOSE_WRITE, IN_CREATE, IN_DELETE,
    IN_DELETE_SELF, IN_ISDIR, IN_MODIFY, IN_MOVED_FROM, IN_MOVED_TO, IN_MOVE_SELF, IN_OPEN,
    IN_Q_OVERFLOW,
};
use crate::watch::handle::RegistrationGuard;

/// Size of the fixed part of a kernel `inotify_event`; names are padded to it.
const INOTIFY_EVENT_ALIGN: u32 = 16;

/// One notification as delivered for a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChangeEvent {
    pub path: PathBuf,
    pub mask: u32,
    /// Length of the name field of the kernel record; 0 when the event is
    /// about the watched directory itself.
    pub len: u32,
}

impl RawChangeEvent {
    pub fn new(path: impl Into<PathBuf>, mask: u32, len: u32) -> Self {
        Self {
            path: path.into(),
            mask,
            len,
        }
    }

    /// Build an event for `path` under the watched `dir`, computing the
    /// record length the way the kernel pads it.
    pub fn for_watch(dir: &Path, path: impl Into<PathBuf>, mask: u32) -> Self {
        let path = path.into();
        let len = record_len(dir, &path);
        Self { path, mask, len }
    }
}

fn record_len(dir: &Path, path: &Path) -> u32 {
    let name_len = match path.strip_prefix(dir) {
        Ok(rel) if rel.as_os_str().is_empty() => return 0,
        Ok(rel) => rel.as_os_str().len(),
        Err(_) => path.file_name().map_or(0, |n| n.len()),
    };
    if name_len == 0 {
        return 0;
    }
    let with_nul = u32::try_from(name_len).unwrap_or(u32::MAX - INOTIFY_EVENT_ALIGN) + 1;
    with_nul.next_multiple_of(INOTIFY_EVENT_ALIGN)
}

/// Channels for one opened directory watch.
pub struct SourceStream {
    pub events: mpsc::UnboundedReceiver<RawChangeEvent>,
    pub errors: mpsc::UnboundedReceiver<FwatcherError>,
    pub guard: RegistrationGuard,
}

impl Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream").finish_non_exhaustive()
    }
}

/// Opens per-directory watches.
pub trait WatchSource: Send + Sync + Debug {
    /// Start watching `dir` (not its descendants) for events in `mask`.
    fn open(&self, dir: &Path, mask: u32) -> Result<SourceStream>;
}

/// Portable source backed by `notify`, used where inotify is not available.
///
/// Every directory gets its own `notify` watcher, so each one costs a
/// backend instance; on Linux use `InotifySource` instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifySource;

impl NotifySource {
    pub fn new() -> Self {
        Self
    }
}

impl WatchSource for NotifySource {
    fn open(&self, dir: &Path, mask: u32) -> Result<SourceStream> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<RawChangeEvent>();
        let (error_tx, error_rx) = mpsc::unbounded_channel::<FwatcherError>();

        let watched = dir.to_path_buf();
        let wanted = mask & IN_ALL_EVENTS;

        // Called synchronously on notify's thread.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for raw in translate(&watched, &event) {
                        if raw.mask & wanted == 0 && raw.mask & IN_Q_OVERFLOW == 0 {
                            continue;
                        }
                        if event_tx.send(raw).is_err() {
                            // Loop is gone; the registration is about to be dropped.
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = error_tx.send(FwatcherError::from(err));
                }
            },
            Config::default(),
        )?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(SourceStream {
            events: event_rx,
            errors: error_rx,
            guard: Box::new(watcher),
        })
    }
}

/// Translate a `notify` event into raw inotify-style events for `dir`.
///
/// `IN_ISDIR` comes from the event kind for creations and removals and from
/// the filesystem otherwise; it cannot be recovered for `IN_MOVED_FROM`.
/// Paired rename events are skipped because the separate from / to halves
/// are delivered as well.
pub fn translate(dir: &Path, event: &Event) -> Vec<RawChangeEvent> {
    if event.need_rescan() {
        return vec![RawChangeEvent::new(dir, IN_Q_OVERFLOW, 0)];
    }

    event
        .paths
        .iter()
        .filter_map(|path| {
            let is_self = path.as_path() == dir;
            mask_for(&event.kind, path, is_self).map(|mask| RawChangeEvent::for_watch(dir, path, mask))
        })
        .collect()
}

fn mask_for(kind: &EventKind, path: &Path, is_self: bool) -> Option<u32> {
    let dir_bit = || if path.is_dir() { IN_ISDIR } else { 0 };

    let mask = match kind {
        EventKind::Access(AccessKind::Read) => IN_ACCESS | dir_bit(),
        EventKind::Access(AccessKind::Open(_)) => IN_OPEN | dir_bit(),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => IN_CLOSE_WRITE | dir_bit(),
        EventKind::Access(AccessKind::Close(_)) => IN_CLOSE_NOWRITE | dir_bit(),
        EventKind::Create(CreateKind::Folder) => IN_CREATE | IN_ISDIR,
        EventKind::Create(CreateKind::File) => IN_CREATE,
        EventKind::Create(_) => IN_CREATE | dir_bit(),
        EventKind::Modify(ModifyKind::Metadata(_)) => IN_ATTRIB | dir_bit(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) if is_self => IN_MOVE_SELF,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => IN_MOVED_FROM,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => IN_MOVED_TO | dir_bit(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            if path.exists() {
                IN_MOVED_TO | dir_bit()
            } else {
                IN_MOVED_FROM
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => return None,
        EventKind::Modify(_) => IN_MODIFY,
        EventKind::Remove(_) if is_self => IN_DELETE_SELF,
        EventKind::Remove(RemoveKind::Folder) => IN_DELETE | IN_ISDIR,
        EventKind::Remove(_) => IN_DELETE,
        _ => return None,
    };
    Some(mask)
}
