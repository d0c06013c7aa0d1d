// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigOverrides, RawConfigFile, Settings};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw_config = load_from_path(&path)?;
    Settings::try_from(raw_config)
}

/// Build settings from an optional config file with command-line values
/// layered on top. Without a file, the built-in defaults are the base.
pub fn resolve_settings(
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<Settings> {
    let mut raw = match config_path {
        Some(path) => load_from_path(path)?,
        None => RawConfigFile::default(),
    };
    raw.apply(overrides);
    Settings::try_from(raw)
}

/// Make `dir` absolute: canonical when it exists, otherwise joined to the
/// current directory.
pub fn absolute_root(dir: &Path) -> PathBuf {
    dir.canonicalize()
        .or_else(|_| std::path::absolute(dir))
        .unwrap_or_else(|_| dir.to_path_buf())
}
