// src/config/mod.rs

//! Configuration: optional TOML file plus command-line overrides.
//!
//! - [`model`] is the raw, deserialized shape of the file.
//! - [`validate`] turns it into checked [`Settings`].
//! - [`loader`] reads files and merges overrides.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{absolute_root, load_and_validate, load_from_path, resolve_settings};
pub use model::{ConfigOverrides, RawConfigFile, Settings, TriggerSection, WatchSection};
