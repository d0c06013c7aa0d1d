// src/events/filter.rs

use std::collections::BTreeSet;

/// Configured set of labels for which a command is dispatched.
///
/// Membership is tested against the *whole* joined label of an event, so a
/// compound label such as `IN_CREATE,IN_ISDIR` only matches an entry that is
/// exactly that string; the single entry `IN_CREATE` does not match it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilterSet {
    entries: BTreeSet<String>,
}

impl EventFilterSet {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(Into::into)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Parse a comma separated list, dropping empty fields.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn matches(&self, label: &str) -> bool {
        self.entries.contains(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
