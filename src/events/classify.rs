// src/events/classify.rs

//! Bitmask -> label classification.

use std::path::{Path, PathBuf};

use super::flags::{self, IN_CREATE, IN_DELETE, IN_ISDIR, IN_MOVED_FROM, IN_MOVED_TO};

/// Names of every flag whose bits are fully contained in `mask`, in name
/// order. Composite flags match only when all of their bits are present.
pub fn classify_flags(mask: u32) -> Vec<&'static str> {
    flags::flags()
        .filter(|(_, value)| mask & value == *value)
        .map(|(name, _)| name)
        .collect()
}

/// Join the matching flag names with `,`.
///
/// Falls back to the decimal value of `mask` when no flag matches.
pub fn classify(mask: u32) -> String {
    join_label(mask, &classify_flags(mask))
}

fn join_label(mask: u32, names: &[&str]) -> String {
    if names.is_empty() {
        mask.to_string()
    } else {
        names.join(",")
    }
}

/// A raw event after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub path: PathBuf,
    pub mask: u32,
    pub flags: Vec<&'static str>,
    pub label: String,
}

impl ClassifiedEvent {
    pub fn new(path: impl Into<PathBuf>, mask: u32) -> Self {
        let flags = classify_flags(mask);
        let label = join_label(mask, &flags);
        Self {
            path: path.into(),
            mask,
            flags,
            label,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.mask & IN_ISDIR != 0
    }

    /// A directory appeared below the watch, either created or moved in.
    pub fn is_dir_created(&self) -> bool {
        self.is_dir() && self.mask & (IN_CREATE | IN_MOVED_TO) != 0
    }

    /// A directory disappeared from below the watch, deleted or moved away.
    pub fn is_dir_removed(&self) -> bool {
        self.is_dir() && self.mask & (IN_DELETE | IN_MOVED_FROM) != 0
    }

    pub fn is_moved_from(&self) -> bool {
        self.mask & IN_MOVED_FROM != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::flags::*;

    #[test]
    fn directory_creation_is_a_compound_label() {
        assert_eq!(classify(IN_CREATE | IN_ISDIR), "IN_CREATE,IN_ISDIR");
    }

    #[test]
    fn composite_flags_match_when_all_bits_present() {
        assert_eq!(classify(IN_CLOSE_WRITE), "IN_CLOSE_WRITE");
        assert_eq!(
            classify(IN_CLOSE_WRITE | IN_CLOSE_NOWRITE),
            "IN_CLOSE,IN_CLOSE_NOWRITE,IN_CLOSE_WRITE"
        );
        assert_eq!(
            classify(IN_MOVE),
            "IN_MOVE,IN_MOVED_FROM,IN_MOVED_TO"
        );
    }

    #[test]
    fn all_events_mask_lists_every_base_flag() {
        let names = classify_flags(IN_ALL_EVENTS);
        assert!(names.contains(&"IN_ALL_EVENTS"));
        assert!(names.contains(&"IN_CLOSE"));
        assert!(names.contains(&"IN_MOVE"));
        assert!(names.contains(&"IN_OPEN"));
        assert!(!names.contains(&"IN_ISDIR"));
    }

    #[test]
    fn unmatched_mask_falls_back_to_decimal() {
        assert_eq!(classify(0), "0");
        // 0x1000 is not assigned to any flag.
        assert_eq!(classify(0x1000), "4096");
    }

    #[test]
    fn classification_is_stable() {
        let mask = IN_DELETE | IN_ISDIR | IN_IGNORED;
        assert_eq!(classify(mask), classify(mask));
        assert_eq!(classify(mask), "IN_DELETE,IN_IGNORED,IN_ISDIR");
    }

    #[test]
    fn structural_helpers() {
        let created = ClassifiedEvent::new("/w/a", IN_CREATE | IN_ISDIR);
        assert!(created.is_dir_created());
        assert!(!created.is_dir_removed());
        assert_eq!(created.label, "IN_CREATE,IN_ISDIR");

        let moved_in = ClassifiedEvent::new("/w/b", IN_MOVED_TO | IN_ISDIR);
        assert!(moved_in.is_dir_created());

        let moved_away = ClassifiedEvent::new("/w/c", IN_MOVED_FROM | IN_ISDIR);
        assert!(moved_away.is_dir_removed());

        let file = ClassifiedEvent::new("/w/f.txt", IN_CREATE);
        assert!(!file.is_dir_created());
        assert!(!file.is_dir_removed());
    }
}
