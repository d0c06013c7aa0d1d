// src/events/flags.rs

//! Static inotify flag table.
//!
//! Values are the Linux inotify ABI values. The table includes the composite
//! flags (`IN_ALL_EVENTS`, `IN_CLOSE`, `IN_MOVE`), the watch-only option flags
//! and the flags only ever reported by the kernel (`IN_ISDIR`, `IN_IGNORED`,
//! ...). It is built once and iterated in name order.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::errors::{FwatcherError, Result};

pub const IN_ACCESS: u32 = 0x0000_0001;
pub const IN_MODIFY: u32 = 0x0000_0002;
pub const IN_ATTRIB: u32 = 0x0000_0004;
pub const IN_CLOSE_WRITE: u32 = 0x0000_0008;
pub const IN_CLOSE_NOWRITE: u32 = 0x0000_0010;
pub const IN_OPEN: u32 = 0x0000_0020;
pub const IN_MOVED_FROM: u32 = 0x0000_0040;
pub const IN_MOVED_TO: u32 = 0x0000_0080;
pub const IN_CREATE: u32 = 0x0000_0100;
pub const IN_DELETE: u32 = 0x0000_0200;
pub const IN_DELETE_SELF: u32 = 0x0000_0400;
pub const IN_MOVE_SELF: u32 = 0x0000_0800;
pub const IN_UNMOUNT: u32 = 0x0000_2000;
pub const IN_Q_OVERFLOW: u32 = 0x0000_4000;
pub const IN_IGNORED: u32 = 0x0000_8000;
pub const IN_CLOEXEC: u32 = 0x0008_0000;
pub const IN_ONLYDIR: u32 = 0x0100_0000;
pub const IN_DONT_FOLLOW: u32 = 0x0200_0000;
pub const IN_EXCL_UNLINK: u32 = 0x0400_0000;
pub const IN_MASK_ADD: u32 = 0x2000_0000;
pub const IN_ISDIR: u32 = 0x4000_0000;
pub const IN_ONESHOT: u32 = 0x8000_0000;

pub const IN_CLOSE: u32 = IN_CLOSE_WRITE | IN_CLOSE_NOWRITE;
pub const IN_MOVE: u32 = IN_MOVED_FROM | IN_MOVED_TO;
pub const IN_ALL_EVENTS: u32 = IN_ACCESS
    | IN_MODIFY
    | IN_ATTRIB
    | IN_CLOSE_WRITE
    | IN_CLOSE_NOWRITE
    | IN_OPEN
    | IN_MOVED_FROM
    | IN_MOVED_TO
    | IN_CREATE
    | IN_DELETE
    | IN_DELETE_SELF
    | IN_MOVE_SELF;

/// Flag names that make up the default watch mask.
pub const DEFAULT_MASK_NAMES: &[&str] = &[
    "IN_ALL_EVENTS",
    "IN_ISDIR",
    "IN_CLOSE",
    "IN_MOVE",
    "IN_EXCL_UNLINK",
];

/// Default `--events` value (comma separated filter entries).
pub const DEFAULT_EVENTS: &str = "IN_ALL_EVENTS,IN_ISDIR,IN_CLOSE,IN_MOVE,IN_EXCL_UNLINK";

static FLAG_TABLE: LazyLock<BTreeMap<&'static str, u32>> = LazyLock::new(|| {
    BTreeMap::from([
        // base events
        ("IN_ACCESS", IN_ACCESS),
        ("IN_ATTRIB", IN_ATTRIB),
        ("IN_CLOSE_NOWRITE", IN_CLOSE_NOWRITE),
        ("IN_CLOSE_WRITE", IN_CLOSE_WRITE),
        ("IN_CREATE", IN_CREATE),
        ("IN_DELETE", IN_DELETE),
        ("IN_DELETE_SELF", IN_DELETE_SELF),
        ("IN_MODIFY", IN_MODIFY),
        ("IN_MOVED_FROM", IN_MOVED_FROM),
        ("IN_MOVED_TO", IN_MOVED_TO),
        ("IN_MOVE_SELF", IN_MOVE_SELF),
        ("IN_OPEN", IN_OPEN),
        ("IN_CLOEXEC", IN_CLOEXEC),
        // composites
        ("IN_ALL_EVENTS", IN_ALL_EVENTS),
        ("IN_CLOSE", IN_CLOSE),
        ("IN_MOVE", IN_MOVE),
        // watch options
        ("IN_DONT_FOLLOW", IN_DONT_FOLLOW),
        ("IN_EXCL_UNLINK", IN_EXCL_UNLINK),
        ("IN_MASK_ADD", IN_MASK_ADD),
        ("IN_ONESHOT", IN_ONESHOT),
        ("IN_ONLYDIR", IN_ONLYDIR),
        // reported by the kernel only
        ("IN_IGNORED", IN_IGNORED),
        ("IN_ISDIR", IN_ISDIR),
        ("IN_Q_OVERFLOW", IN_Q_OVERFLOW),
        ("IN_UNMOUNT", IN_UNMOUNT),
    ])
});

/// Iterate the flag table in lexicographic name order.
pub fn flags() -> impl Iterator<Item = (&'static str, u32)> {
    FLAG_TABLE.iter().map(|(name, value)| (*name, *value))
}

/// Look up the bit value of a flag by name.
pub fn flag_value(name: &str) -> Option<u32> {
    FLAG_TABLE.get(name.trim()).copied()
}

/// OR together the values of the named flags.
///
/// Unknown names are a configuration error.
pub fn mask_from_names<S: AsRef<str>>(names: &[S]) -> Result<u32> {
    names.iter().try_fold(0u32, |mask, name| {
        let name = name.as_ref();
        flag_value(name)
            .map(|value| mask | value)
            .ok_or_else(|| FwatcherError::ConfigError(format!("unknown inotify flag '{name}'")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composites_are_unions_of_base_flags() {
        assert_eq!(IN_CLOSE, 0x18);
        assert_eq!(IN_MOVE, 0xC0);
        assert_eq!(IN_ALL_EVENTS, 0xFFF);
    }

    #[test]
    fn table_iterates_in_name_order() {
        let names: Vec<&str> = flags().map(|(name, _)| name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 25);
    }

    #[test]
    fn default_mask_resolves() {
        let mask = mask_from_names(DEFAULT_MASK_NAMES).unwrap();
        assert_eq!(mask, IN_ALL_EVENTS | IN_ISDIR | IN_EXCL_UNLINK);
    }

    #[test]
    fn unknown_flag_name_is_rejected() {
        let err = mask_from_names(&["IN_CREATE", "IN_BOGUS"]).unwrap_err();
        assert!(err.to_string().contains("IN_BOGUS"));
    }
}
