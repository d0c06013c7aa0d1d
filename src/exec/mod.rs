// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`template`] owns `%f` / `%t` substitution and argv tokenization.
//! - [`dispatcher`] provides the `Dispatcher` trait and the production
//!   `CommandDispatcher`, which runs the command with
//!   `tokio::process::Command`, captures stdout / stderr in memory and
//!   flushes them once the process exits.

pub mod dispatcher;
pub mod template;

pub use dispatcher::{flush_output, CommandDispatcher, DispatchOutput, Dispatcher};
pub use template::{substitute, CommandTemplate, Tokenizer, WhitespaceTokenizer};
