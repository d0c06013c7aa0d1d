// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fwatcher::config::{load_and_validate, load_from_path, resolve_settings, ConfigOverrides};
use fwatcher::errors::FwatcherError;
use fwatcher::events::flags::{IN_CLOSE_WRITE, IN_CREATE, IN_ISDIR};
use fwatcher::watch::{WatchOptions, DEFAULT_WATCH_MASK};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("fwatcher.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn full_config_file_is_loaded() -> TestResult {
    let tmp = TempDir::new()?;
    let path = write_config(
        &tmp,
        r#"
[watch]
dir = "/srv/incoming"
mask = ["IN_CREATE", "IN_CLOSE_WRITE", "IN_ISDIR"]
max_watches = 64

[trigger]
events = ["IN_CLOSE_WRITE", "IN_CREATE,IN_ISDIR"]
cmd = "process %f"
timeout_secs = 30
"#,
    );

    let settings = load_and_validate(&path)?;
    assert_eq!(settings.dir, Path::new("/srv/incoming"));
    assert_eq!(settings.mask, IN_CREATE | IN_CLOSE_WRITE | IN_ISDIR);
    assert_eq!(settings.max_watches, Some(64));
    assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    assert_eq!(settings.template.as_str(), "process %f");
    assert_eq!(
        settings.watch_options(),
        WatchOptions {
            mask: IN_CREATE | IN_CLOSE_WRITE | IN_ISDIR,
            max_watches: Some(64),
        }
    );

    // The compound entry stays a single filter entry.
    assert_eq!(settings.filters.len(), 2);
    assert!(settings.filters.matches("IN_CREATE,IN_ISDIR"));
    assert!(!settings.filters.matches("IN_CREATE"));
    assert!(!settings.filters.matches("IN_ISDIR"));
    Ok(())
}

#[test]
fn empty_file_uses_defaults() -> TestResult {
    let tmp = TempDir::new()?;
    let path = write_config(&tmp, "");

    let settings = load_and_validate(&path)?;
    assert_eq!(settings.dir, Path::new("/tmp"));
    assert_eq!(settings.mask, DEFAULT_WATCH_MASK);
    assert_eq!(settings.template.as_str(), "echo %f %t");
    assert_eq!(settings.max_watches, None);
    assert_eq!(settings.timeout, None);
    for name in ["IN_ALL_EVENTS", "IN_ISDIR", "IN_CLOSE", "IN_MOVE", "IN_EXCL_UNLINK"] {
        assert!(settings.filters.matches(name), "{name} missing from defaults");
    }
    Ok(())
}

#[test]
fn unknown_mask_flag_is_rejected() -> TestResult {
    let tmp = TempDir::new()?;
    let path = write_config(&tmp, "[watch]\nmask = [\"IN_CREATE\", \"IN_BOGUS\"]\n");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, FwatcherError::ConfigError(_)));
    assert!(err.to_string().contains("IN_BOGUS"));
    Ok(())
}

#[test]
fn zero_limits_are_rejected() -> TestResult {
    let tmp = TempDir::new()?;

    let path = write_config(&tmp, "[watch]\nmax_watches = 0\n");
    assert!(load_and_validate(&path).unwrap_err().to_string().contains("max_watches"));

    let path = write_config(&tmp, "[trigger]\ntimeout_secs = 0\n");
    assert!(load_and_validate(&path).unwrap_err().to_string().contains("timeout_secs"));

    let path = write_config(&tmp, "[trigger]\ncmd = \"  \"\n");
    assert!(load_and_validate(&path).unwrap_err().to_string().contains("cmd"));
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let tmp = TempDir::new()?;
    let path = write_config(&tmp, "[watch\ndir = ");

    assert!(matches!(load_from_path(&path), Err(FwatcherError::TomlError(_))));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_from_path("/definitely/not/here/fwatcher.toml").unwrap_err();
    assert!(matches!(err, FwatcherError::IoError(_)));
}

#[test]
fn command_line_values_override_the_file() -> TestResult {
    let tmp = TempDir::new()?;
    let path = write_config(
        &tmp,
        r#"
[watch]
dir = "/from/file"
max_watches = 10

[trigger]
events = ["IN_DELETE"]
cmd = "file-cmd %f"
"#,
    );

    let overrides = ConfigOverrides {
        dir: Some(PathBuf::from("/from/cli")),
        events: Some("IN_CREATE, IN_MOVED_TO,,".to_string()),
        mask: Some("IN_CREATE,IN_MOVED_TO".to_string()),
        timeout_secs: Some(5),
        ..ConfigOverrides::default()
    };
    let settings = resolve_settings(Some(&path), overrides)?;

    assert_eq!(settings.dir, Path::new("/from/cli"));
    assert_eq!(settings.mask_names, vec!["IN_CREATE", "IN_MOVED_TO"]);
    assert_eq!(settings.template.as_str(), "file-cmd %f");
    assert_eq!(settings.max_watches, Some(10));
    assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
    assert_eq!(settings.filters.len(), 2);
    assert!(settings.filters.matches("IN_MOVED_TO"));
    assert!(!settings.filters.matches("IN_DELETE"));
    Ok(())
}

#[test]
fn overrides_without_a_file_start_from_defaults() -> TestResult {
    let settings = resolve_settings(
        None,
        ConfigOverrides {
            cmd: Some("touch %f.seen".to_string()),
            ..ConfigOverrides::default()
        },
    )?;

    assert_eq!(settings.dir, Path::new("/tmp"));
    assert_eq!(settings.template.as_str(), "touch %f.seen");
    assert_eq!(settings.watch_options().mask, DEFAULT_WATCH_MASK);
    Ok(())
}
