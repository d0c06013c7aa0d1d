// src/exec/dispatcher.rs

//! Runs the configured command for an actionable event.
//!
//! Watch loops talk to a [`Dispatcher`] rather than spawning processes
//! themselves, so tests can record dispatches without running anything.
//! [`CommandDispatcher`] is the production implementation.

use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::pin::Pin;
use std::process::{ExitStatus, Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::errors::DispatchError;
use crate::exec::template::{CommandTemplate, Tokenizer, WhitespaceTokenizer};

/// Captured result of one dispatched command.
#[derive(Debug, Default)]
pub struct DispatchOutput {
    /// The command line after substitution.
    pub command: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: Option<ExitStatus>,
    pub error: Option<DispatchError>,
}

impl DispatchOutput {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Trait abstracting how an actionable event is turned into a command run.
pub trait Dispatcher: Send + Sync {
    /// Run the command for `path` / `label` to completion.
    ///
    /// Failures are reported inside the returned [`DispatchOutput`]; they are
    /// never fatal to the caller.
    fn dispatch<'a>(
        &'a self,
        path: &'a Path,
        label: &'a str,
    ) -> Pin<Box<dyn Future<Output = DispatchOutput> + Send + 'a>>;
}

/// Spawns the rendered template as a child process and flushes its output to
/// the process-wide stdout / stderr.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    template: CommandTemplate,
    tokenizer: Arc<dyn Tokenizer>,
    timeout: Option<Duration>,
}

impl CommandDispatcher {
    pub fn new(template: CommandTemplate) -> Self {
        Self {
            template,
            tokenizer: Arc::new(WhitespaceTokenizer),
            timeout: None,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    /// Kill the command if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    /// Render, spawn and wait for the command without flushing its output.
    pub async fn run(&self, path: &Path, label: &str) -> DispatchOutput {
        let command = self.template.render(path, label);
        info!(cmd = %command, "exec");

        let argv = self.tokenizer.tokenize(&command);
        let mut out = DispatchOutput {
            command,
            ..DispatchOutput::default()
        };

        match execute(&argv, self.timeout).await {
            Ok(output) => {
                debug!(
                    cmd = %out.command,
                    status = %output.status,
                    stdout_len = output.stdout.len(),
                    stderr_len = output.stderr.len(),
                    "command finished"
                );
                if !output.status.success() {
                    out.error = Some(DispatchError::Exit(output.status));
                }
                out.status = Some(output.status);
                out.stdout = output.stdout;
                out.stderr = output.stderr;
            }
            Err(err) => out.error = Some(err),
        }

        if let Some(err) = &out.error {
            error!(cmd = %out.command, error = %err, "command failed");
        }

        out
    }
}

impl Dispatcher for CommandDispatcher {
    fn dispatch<'a>(
        &'a self,
        path: &'a Path,
        label: &'a str,
    ) -> Pin<Box<dyn Future<Output = DispatchOutput> + Send + 'a>> {
        Box::pin(async move {
            let out = self.run(path, label).await;
            flush_to_std(&out);
            out
        })
    }
}

async fn execute(argv: &[String], timeout: Option<Duration>) -> Result<Output, DispatchError> {
    let (program, args) = argv.split_first().ok_or(DispatchError::EmptyCommand)?;

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| DispatchError::Spawn {
            program: program.clone(),
            source,
        })?;

    // Dropping the future on timeout drops the child, which kills it.
    let wait = child.wait_with_output();
    match timeout {
        Some(limit) => tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| DispatchError::TimedOut(limit))?
            .map_err(DispatchError::Wait),
        None => wait.await.map_err(DispatchError::Wait),
    }
}

fn flush_to_std(out: &DispatchOutput) {
    let stdout = io::stdout();
    let stderr = io::stderr();
    if let Err(err) = flush_output(out, &mut stdout.lock(), &mut stderr.lock()) {
        warn!(error = %err, "failed to flush command output");
    }
}

/// Write the error text (if any) and each non-empty buffer once, newline
/// terminated, to the matching stream.
pub fn flush_output<O: Write, E: Write>(
    out: &DispatchOutput,
    stdout: &mut O,
    stderr: &mut E,
) -> io::Result<()> {
    if let Some(err) = &out.error {
        writeln!(stderr, "{err}")?;
    }
    if !out.stdout.is_empty() {
        stdout.write_all(&out.stdout)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }
    if !out.stderr.is_empty() {
        stderr.write_all(&out.stderr)?;
        stderr.write_all(b"\n")?;
    }
    stderr.flush()
}
