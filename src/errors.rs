// src/errors.rs

//! Crate-wide error types.
//!
//! [`FwatcherError`] covers configuration, watch setup and the notification
//! source. [`DispatchError`] is kept separate because command failures are
//! never propagated out of a watch loop: they are logged and written to stderr.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FwatcherError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Notification source error: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("Cannot watch root directory {path:?}: {reason}")]
    RootWatch { path: PathBuf, reason: String },

    #[error("Cannot watch directory {path:?}: {reason}")]
    WatchFailed { path: PathBuf, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a dispatched command did not complete successfully.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("command is empty after substitution")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for command: {0}")]
    Wait(#[source] std::io::Error),

    #[error("{0}")]
    Exit(ExitStatus),

    #[error("command timed out after {0:?}")]
    TimedOut(Duration),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FwatcherError>;
