// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::events::filter::EventFilterSet;
use crate::events::flags::{DEFAULT_EVENTS, DEFAULT_MASK_NAMES};
use crate::exec::template::CommandTemplate;
use crate::watch::tree::WatchOptions;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// dir = "/srv/incoming"
/// mask = ["IN_ALL_EVENTS", "IN_ISDIR"]
/// max_watches = 8192
///
/// [trigger]
/// events = ["IN_CLOSE_WRITE", "IN_CREATE,IN_ISDIR"]
/// cmd = "echo %f %t"
/// timeout_secs = 30
/// ```
///
/// All sections are optional and have the same defaults as the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub trigger: TriggerSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Root directory of the watched tree.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Flag names OR-ed together into the mask requested for every directory.
    #[serde(default = "default_mask")]
    pub mask: Vec<String>,

    /// Stop adding directory watches once this many are active.
    #[serde(default)]
    pub max_watches: Option<usize>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            mask: default_mask(),
            max_watches: None,
        }
    }
}

/// `[trigger]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSection {
    /// Labels that cause the command to run. Each entry is compared with the
    /// full label of an event, so `"IN_CREATE,IN_ISDIR"` is one entry.
    #[serde(default = "default_events")]
    pub events: Vec<String>,

    /// Command template; `%f` is the path, `%t` the event label.
    #[serde(default = "default_cmd")]
    pub cmd: String,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for TriggerSection {
    fn default() -> Self {
        Self {
            events: default_events(),
            cmd: default_cmd(),
            timeout_secs: None,
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_mask() -> Vec<String> {
    DEFAULT_MASK_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_events() -> Vec<String> {
    split_csv(DEFAULT_EVENTS)
}

fn default_cmd() -> String {
    "echo %f %t".to_string()
}

/// Split on commas, dropping empty fields.
pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Values given on the command line; `None` keeps the file / default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dir: Option<PathBuf>,
    /// Comma separated filter entries.
    pub events: Option<String>,
    pub cmd: Option<String>,
    /// Comma separated flag names.
    pub mask: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_watches: Option<usize>,
}

impl RawConfigFile {
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.dir {
            self.watch.dir = dir;
        }
        if let Some(events) = overrides.events {
            self.trigger.events = split_csv(&events);
        }
        if let Some(cmd) = overrides.cmd {
            self.trigger.cmd = cmd;
        }
        if let Some(mask) = overrides.mask {
            self.watch.mask = split_csv(&mask);
        }
        if overrides.timeout_secs.is_some() {
            self.trigger.timeout_secs = overrides.timeout_secs;
        }
        if overrides.max_watches.is_some() {
            self.watch.max_watches = overrides.max_watches;
        }
    }
}

/// Validated settings the rest of the application runs on.
#[derive(Debug, Clone)]
pub struct Settings {
    pub dir: PathBuf,
    pub filters: EventFilterSet,
    pub template: CommandTemplate,
    pub mask: u32,
    pub mask_names: Vec<String>,
    pub max_watches: Option<usize>,
    pub timeout: Option<Duration>,
}

impl Settings {
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            mask: self.mask,
            max_watches: self.max_watches,
        }
    }
}
