// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::ConfigOverrides;

/// Command-line arguments for `fwatcher`.
///
/// Every value is optional so that a `--config` file can provide it; anything
/// given here wins over the file.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fwatcher",
    version,
    about = "Watch a directory tree and run a command for matching inotify events.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to watch, including every subdirectory.
    ///
    /// Default: `/tmp`.
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Comma-separated event labels that trigger the command.
    ///
    /// An event matches only if its whole label (e.g. `IN_CREATE,IN_ISDIR`
    /// for a new directory) equals one entry. Because the list is split on
    /// commas, compound entries can only be given in the config file.
    ///
    /// Default: `IN_ALL_EVENTS,IN_ISDIR,IN_CLOSE,IN_MOVE,IN_EXCL_UNLINK`.
    #[arg(long, value_name = "LABELS")]
    pub events: Option<String>,

    /// Command to run; `%f` becomes the path and `%t` the event label.
    ///
    /// Default: `echo %f %t`.
    #[arg(long, value_name = "TEMPLATE")]
    pub cmd: Option<String>,

    /// Comma-separated flag names requested for every watched directory.
    #[arg(long, value_name = "FLAGS")]
    pub mask: Option<String>,

    /// Path to a TOML config file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Kill a command that runs longer than this.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Maximum number of directories watched at once.
    #[arg(long, value_name = "N")]
    pub max_watches: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FWATCHER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the settings, but don't watch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print every known flag name with its value and exit.
    #[arg(long)]
    pub list_flags: bool,
}

impl CliArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            dir: self.dir.clone(),
            events: self.events.clone(),
            cmd: self.cmd.clone(),
            mask: self.mask.clone(),
            timeout_secs: self.timeout_secs,
            max_watches: self.max_watches,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
