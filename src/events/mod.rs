// src/events/mod.rs

//! Event classification.
//!
//! - [`flags`] holds the immutable inotify flag table (name -> bit value).
//! - [`classify`] turns a raw change bitmask into a deterministic label.
//! - [`filter`] decides whether a classified label is actionable.

pub mod classify;
pub mod filter;
pub mod flags;

pub use classify::{classify, classify_flags, ClassifiedEvent};
pub use filter::EventFilterSet;
pub use flags::{flag_value, mask_from_names, DEFAULT_EVENTS, DEFAULT_MASK_NAMES};
