// src/config/validate.rs

use std::time::Duration;

use tracing::warn;

use crate::config::model::{RawConfigFile, Settings};
use crate::errors::{FwatcherError, Result};
use crate::events::filter::EventFilterSet;
use crate::events::flags::mask_from_names;
use crate::exec::template::CommandTemplate;

impl TryFrom<RawConfigFile> for Settings {
    type Error = FwatcherError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_watch(&raw)?;
        let mask = mask_from_names(&raw.watch.mask)?;
        let template = validate_template(&raw)?;
        let timeout = validate_timeout(&raw)?;

        let filters = EventFilterSet::new(raw.trigger.events);
        if filters.is_empty() {
            warn!("no trigger events configured; no command will ever run");
        }

        Ok(Settings {
            dir: raw.watch.dir,
            filters,
            template,
            mask,
            mask_names: raw.watch.mask,
            max_watches: raw.watch.max_watches,
            timeout,
        })
    }
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.dir.as_os_str().is_empty() {
        return Err(FwatcherError::ConfigError(
            "[watch].dir must not be empty".to_string(),
        ));
    }
    if cfg.watch.mask.is_empty() {
        return Err(FwatcherError::ConfigError(
            "[watch].mask must name at least one flag".to_string(),
        ));
    }
    if cfg.watch.max_watches == Some(0) {
        return Err(FwatcherError::ConfigError(
            "[watch].max_watches must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_template(cfg: &RawConfigFile) -> Result<CommandTemplate> {
    if cfg.trigger.cmd.trim().is_empty() {
        return Err(FwatcherError::ConfigError(
            "[trigger].cmd must not be empty".to_string(),
        ));
    }

    let template = CommandTemplate::new(cfg.trigger.cmd.clone());
    let (paths, labels) = template.placeholder_counts();
    if paths > 1 || labels > 1 {
        warn!(
            cmd = %cfg.trigger.cmd,
            "only the first %f and the first %t are substituted"
        );
    }
    Ok(template)
}

fn validate_timeout(cfg: &RawConfigFile) -> Result<Option<Duration>> {
    match cfg.trigger.timeout_secs {
        Some(0) => Err(FwatcherError::ConfigError(
            "[trigger].timeout_secs must be >= 1 (got 0)".to_string(),
        )),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}
