// src/watch/watch_loop.rs

//! Per-directory event loop.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::FwatcherError;
use crate::events::classify::ClassifiedEvent;
use crate::events::flags::IN_Q_OVERFLOW;
use crate::watch::handle::StopSignal;
use crate::watch::source::RawChangeEvent;
use crate::watch::tree::WatchTree;

/// Consumes the notification stream of one watched directory.
///
/// Events are handled strictly in arrival order. Once the directory's handle
/// is stopped the loop exits without looking at anything still queued.
pub struct WatchLoop {
    tree: WatchTree,
    dir: PathBuf,
    events: mpsc::UnboundedReceiver<RawChangeEvent>,
    errors: mpsc::UnboundedReceiver<FwatcherError>,
    stop: StopSignal,
}

impl WatchLoop {
    pub fn new(
        tree: WatchTree,
        dir: PathBuf,
        events: mpsc::UnboundedReceiver<RawChangeEvent>,
        errors: mpsc::UnboundedReceiver<FwatcherError>,
        stop: StopSignal,
    ) -> Self {
        tree.loop_started();
        Self {
            tree,
            dir,
            events,
            errors,
            stop,
        }
    }

    pub async fn run(mut self) {
        debug!(dir = %self.dir.display(), "watch loop started");
        let mut errors_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.stop.stopped() => {
                    debug!(dir = %self.dir.display(), "watch stopped");
                    break;
                }

                event = self.events.recv() => match event {
                    Some(raw) => self.handle_event(raw).await,
                    None => {
                        debug!(dir = %self.dir.display(), "event channel closed");
                        break;
                    }
                },

                err = self.errors.recv(), if errors_open => match err {
                    Some(err) => {
                        warn!(dir = %self.dir.display(), error = %err, "notification source error");
                    }
                    None => errors_open = false,
                },
            }
        }

        debug!(dir = %self.dir.display(), "watch loop finished");
    }

    async fn handle_event(&self, raw: RawChangeEvent) {
        if raw.len == 0 {
            if raw.mask & IN_Q_OVERFLOW != 0 {
                warn!(dir = %self.dir.display(), "event queue overflowed; events were lost");
            }
            return;
        }

        let len = raw.len;
        let event = ClassifiedEvent::new(raw.path, raw.mask);
        let registry = self.tree.registry();

        if event.is_dir_created() {
            self.tree.watch_subtree(event.path());
        } else if event.is_dir_removed()
            || (event.is_moved_from() && registry.contains(event.path()))
        {
            registry.unregister(event.path());
        }

        info!(path = %event.path.display(), label = %event.label, len, "event");

        if !self.tree.filters().matches(&event.label) {
            return;
        }
        if self.stop.is_stopped() {
            return;
        }
        let _ = self.tree.dispatcher().dispatch(event.path(), &event.label).await;
    }
}

impl Drop for WatchLoop {
    fn drop(&mut self) {
        self.tree.loop_finished();
    }
}
