// src/watch/mod.rs

//! Dynamic recursive directory watching.
//!
//! This module is responsible for:
//! - Opening one non-recursive watch per directory ([`source`]; on Linux all
//!   of them share one inotify instance, see `inotify_source`).
//! - Tracking which directories are watched ([`registry`], [`handle`]).
//! - Running one event loop per directory that classifies events, keeps the
//!   registry in sync with the tree and dispatches commands ([`watch_loop`]).
//! - Creating handles and spawning loops, including the initial walk of an
//!   existing tree ([`tree`]).

pub mod handle;
#[cfg(target_os = "linux")]
pub mod inotify_source;
pub mod registry;
pub mod source;
pub mod tree;
pub mod watch_loop;

pub use handle::{RegistrationGuard, StopSignal, WatchHandle};
#[cfg(target_os = "linux")]
pub use inotify_source::InotifySource;
pub use registry::{Insertion, WatchRegistry};
pub use source::{translate, NotifySource, RawChangeEvent, SourceStream, WatchSource};
pub use tree::{WatchOptions, WatchOutcome, WatchTree, DEFAULT_WATCH_MASK};
pub use watch_loop::WatchLoop;
