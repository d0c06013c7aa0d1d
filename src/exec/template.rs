// src/exec/template.rs

//! Command template substitution and argv tokenization.

use std::fmt::Debug;
use std::path::Path;

pub const PATH_PLACEHOLDER: &str = "%f";
pub const LABEL_PLACEHOLDER: &str = "%t";

/// Replace the first `%f` with `path`, then the first `%t` (of the result)
/// with `label`. Further placeholders are left untouched.
pub fn substitute(template: &str, path: &str, label: &str) -> String {
    template
        .replacen(PATH_PLACEHOLDER, path, 1)
        .replacen(LABEL_PLACEHOLDER, label, 1)
}

/// A command line containing `%f` / `%t` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
}

impl CommandTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, path: &Path, label: &str) -> String {
        substitute(&self.raw, &path.to_string_lossy(), label)
    }

    /// Number of `%f` and `%t` occurrences in the template.
    pub fn placeholder_counts(&self) -> (usize, usize) {
        (
            self.raw.matches(PATH_PLACEHOLDER).count(),
            self.raw.matches(LABEL_PLACEHOLDER).count(),
        )
    }
}

/// Splits a rendered command line into an argument vector.
pub trait Tokenizer: Send + Sync + Debug {
    fn tokenize(&self, command: &str) -> Vec<String>;
}

/// Splits on runs of whitespace. There is no quoting: an argument can never
/// contain a space.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, command: &str) -> Vec<String> {
        command.split_whitespace().map(str::to_string).collect()
    }
}
