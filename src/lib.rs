// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod events;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{absolute_root, resolve_settings, Settings};
use crate::events::classify::classify;
use crate::events::flags;
use crate::exec::CommandDispatcher;
use crate::fs::RealFileSystem;
#[cfg(target_os = "linux")]
use crate::watch::InotifySource;
#[cfg(not(target_os = "linux"))]
use crate::watch::NotifySource;
use crate::watch::{WatchOptions, WatchSource, WatchTree};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config file + CLI overrides
/// - the watch tree (root watch, initial walk, per-directory loops)
/// - the command dispatcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    if args.list_flags {
        print_flags();
        return Ok(());
    }

    let settings = resolve_settings(args.config.as_deref(), args.overrides())?;

    if args.dry_run {
        print_dry_run(&settings);
        return Ok(());
    }

    let root = absolute_root(&settings.dir);
    let tree = start_watching(&root, settings.mask, &settings)?;

    let filters: Vec<&str> = settings.filters.iter().collect();
    info!(dir = %root.display(), "watched dir");
    info!(?filters, "event filters");
    info!(cmd = %settings.template.as_str(), "event command");
    info!(watched = tree.registry().len(), "waiting for events...");

    // There is no drain: loops and watches are reclaimed by process exit.
    tokio::signal::ctrl_c().await?;
    info!(watched = tree.registry().len(), "interrupted; exiting");
    Ok(())
}

/// Watch `root` recursively with the production source, filesystem and
/// dispatcher. Fails only if the root itself cannot be watched.
pub fn start_watching(root: &Path, mask: u32, settings: &Settings) -> errors::Result<WatchTree> {
    let dispatcher =
        CommandDispatcher::new(settings.template.clone()).with_timeout(settings.timeout);

    let options = WatchOptions {
        mask,
        ..settings.watch_options()
    };

    let tree = WatchTree::new(
        default_source()?,
        Arc::new(RealFileSystem),
        Arc::new(dispatcher),
        settings.filters.clone(),
        options,
    );
    tree.start(root)?;
    Ok(tree)
}

/// One inotify instance shared by every directory watch.
#[cfg(target_os = "linux")]
fn default_source() -> errors::Result<Arc<dyn WatchSource>> {
    Ok(Arc::new(InotifySource::new()?))
}

#[cfg(not(target_os = "linux"))]
fn default_source() -> errors::Result<Arc<dyn WatchSource>> {
    Ok(Arc::new(NotifySource::new()))
}

/// Simple dry-run output: print the resolved settings.
fn print_dry_run(settings: &Settings) {
    println!("fwatcher dry-run");
    println!("  dir         = {}", absolute_root(&settings.dir).display());
    println!("  mask        = {:#010x} ({})", settings.mask, classify(settings.mask));
    println!("  mask flags  = {}", settings.mask_names.join(","));
    println!("  cmd         = {}", settings.template.as_str());
    if let Some(timeout) = settings.timeout {
        println!("  timeout     = {}s", timeout.as_secs());
    }
    if let Some(max) = settings.max_watches {
        println!("  max_watches = {max}");
    }
    println!();

    println!("events ({}):", settings.filters.len());
    for entry in settings.filters.iter() {
        println!("  - {entry}");
    }

    debug!("dry-run complete (nothing watched)");
}

fn print_flags() {
    for (name, value) in flags::flags() {
        println!("{name:<18} {value:#010x}");
    }
}
