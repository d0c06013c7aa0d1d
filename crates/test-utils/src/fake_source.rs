use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use fwatcher::errors::{FwatcherError, Result};
use fwatcher::watch::{RawChangeEvent, SourceStream, WatchSource};

/// A scriptable notification source.
///
/// - records every directory it was asked to open
/// - lets tests push raw events / errors into a directory's channels
/// - can be told to fail for specific directories
/// - records when a registration guard is released (handle stopped)
#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    channels: HashMap<PathBuf, Channels>,
    opened: Vec<PathBuf>,
    released: Vec<PathBuf>,
    failing: HashSet<PathBuf>,
}

#[derive(Debug)]
struct Channels {
    events: mpsc::UnboundedSender<RawChangeEvent>,
    errors: mpsc::UnboundedSender<FwatcherError>,
}

struct FakeRegistration {
    dir: PathBuf,
    state: Arc<Mutex<FakeState>>,
}

impl Drop for FakeRegistration {
    fn drop(&mut self) {
        self.state.lock().unwrap().released.push(self.dir.clone());
    }
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future `open` of `dir` fail.
    pub fn fail_on(&self, dir: impl Into<PathBuf>) {
        self.state.lock().unwrap().failing.insert(dir.into());
    }

    /// Deliver an event on `dir`'s channel. False if nobody is listening.
    pub fn emit(&self, dir: impl AsRef<Path>, event: RawChangeEvent) -> bool {
        let state = self.state.lock().unwrap();
        match state.channels.get(dir.as_ref()) {
            Some(ch) => ch.events.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver an event for `path` below `dir` with a realistic record length.
    pub fn emit_at(&self, dir: impl AsRef<Path>, path: impl Into<PathBuf>, mask: u32) -> bool {
        let dir = dir.as_ref();
        self.emit(dir, RawChangeEvent::for_watch(dir, path, mask))
    }

    pub fn emit_error(&self, dir: impl AsRef<Path>, message: &str) -> bool {
        let state = self.state.lock().unwrap();
        match state.channels.get(dir.as_ref()) {
            Some(ch) => ch
                .errors
                .send(FwatcherError::IoError(io::Error::other(message.to_string())))
                .is_ok(),
            None => false,
        }
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().opened.clone()
    }

    /// How many times `dir` was opened.
    pub fn open_count(&self, dir: impl AsRef<Path>) -> usize {
        let dir = dir.as_ref();
        self.state
            .lock()
            .unwrap()
            .opened
            .iter()
            .filter(|p| p.as_path() == dir)
            .count()
    }

    pub fn released(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().released.clone()
    }
}

impl WatchSource for FakeSource {
    fn open(&self, dir: &Path, _mask: u32) -> Result<SourceStream> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(dir.to_path_buf());

        if state.failing.contains(dir) {
            return Err(FwatcherError::IoError(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("fake: cannot watch {}", dir.display()),
            )));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        state.channels.insert(
            dir.to_path_buf(),
            Channels {
                events: event_tx,
                errors: error_tx,
            },
        );

        Ok(SourceStream {
            events: event_rx,
            errors: error_rx,
            guard: Box::new(FakeRegistration {
                dir: dir.to_path_buf(),
                state: Arc::clone(&self.state),
            }),
        })
    }
}
