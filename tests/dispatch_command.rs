// tests/dispatch_command.rs
//
// Runs real child processes; unix only because it relies on coreutils.
#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use fwatcher::errors::DispatchError;
use fwatcher::exec::{flush_output, CommandDispatcher, CommandTemplate, DispatchOutput, Tokenizer};
use fwatcher_test_utils::init_tracing;

fn dispatcher(cmd: &str) -> CommandDispatcher {
    init_tracing();
    CommandDispatcher::new(CommandTemplate::new(cmd))
}

fn flushed(out: &DispatchOutput) -> (String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    flush_output(out, &mut stdout, &mut stderr).unwrap();
    (
        String::from_utf8(stdout).unwrap(),
        String::from_utf8(stderr).unwrap(),
    )
}

#[tokio::test]
async fn silent_success_writes_nothing() {
    let out = dispatcher("true").run(Path::new("/tmp/a"), "IN_CREATE").await;

    assert!(out.is_success());
    assert!(out.status.unwrap().success());
    assert_eq!(flushed(&out), (String::new(), String::new()));
}

#[tokio::test]
async fn placeholders_are_substituted_and_stdout_captured() {
    let out = dispatcher("echo %f %t").run(Path::new("/tmp/x"), "IN_CREATE").await;

    assert!(out.is_success());
    assert_eq!(out.command, "echo /tmp/x IN_CREATE");
    assert_eq!(out.stdout, b"/tmp/x IN_CREATE\n");

    let (stdout, stderr) = flushed(&out);
    assert_eq!(stdout, "/tmp/x IN_CREATE\n\n");
    assert!(stderr.is_empty());
}

#[tokio::test]
async fn compound_label_is_passed_as_one_argument() {
    let out = dispatcher("printf %s|%s %t %f")
        .run(Path::new("/w/d"), "IN_CREATE,IN_ISDIR")
        .await;

    assert!(out.is_success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "IN_CREATE,IN_ISDIR|/w/d");
}

#[tokio::test]
async fn missing_program_reports_spawn_error() {
    let out = dispatcher("/definitely/not/a/program %f")
        .run(Path::new("/tmp/x"), "IN_CREATE")
        .await;

    match &out.error {
        Some(DispatchError::Spawn { program, .. }) => {
            assert_eq!(program, "/definitely/not/a/program")
        }
        other => panic!("expected spawn error, got {other:?}"),
    }
    assert!(out.status.is_none());

    let (stdout, stderr) = flushed(&out);
    assert!(stdout.is_empty());
    assert!(stderr.contains("/definitely/not/a/program"));
}

#[tokio::test]
async fn nonzero_exit_keeps_captured_output() {
    let out = dispatcher("ls /definitely/not/a/dir").run(Path::new("/x"), "IN_OPEN").await;

    assert!(matches!(out.error, Some(DispatchError::Exit(_))));
    assert!(!out.stderr.is_empty());

    let (_, stderr) = flushed(&out);
    // Error line first, then the child's own stderr.
    let first = stderr.lines().next().unwrap_or_default();
    assert!(first.contains("exit"), "unexpected first line: {first}");
}

#[tokio::test]
async fn slow_command_times_out() {
    let started = std::time::Instant::now();
    let out = dispatcher("sleep 5")
        .with_timeout(Some(Duration::from_millis(100)))
        .run(Path::new("/x"), "IN_CREATE")
        .await;

    assert!(matches!(out.error, Some(DispatchError::TimedOut(_))));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn blank_command_is_rejected_without_spawning() {
    let out = dispatcher("   ").run(Path::new("/x"), "IN_CREATE").await;
    assert!(matches!(out.error, Some(DispatchError::EmptyCommand)));
}

#[derive(Debug)]
struct ShellTokenizer;

impl Tokenizer for ShellTokenizer {
    fn tokenize(&self, command: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), command.into()]
    }
}

#[tokio::test]
async fn tokenizer_can_be_swapped() {
    let out = dispatcher("echo '%f' | tr a-z A-Z")
        .with_tokenizer(ShellTokenizer)
        .run(Path::new("/tmp/with space"), "IN_CREATE")
        .await;

    assert!(out.is_success());
    assert_eq!(out.stdout, b"/TMP/WITH SPACE\n");
}
