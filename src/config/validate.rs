// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DeepCheckError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DeepCheckError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.retention, raw.check))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_checks(cfg)?;
    validate_global_config(cfg)?;
    validate_check_steps(cfg)?;
    Ok(())
}

fn ensure_has_checks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.check.is_empty() {
        return Err(DeepCheckError::ConfigError(
            "config must contain at least one [check.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.store_path.trim().is_empty() {
        return Err(DeepCheckError::ConfigError(
            "[config].store_path must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_check_steps(cfg: &RawConfigFile) -> Result<()> {
    for (name, check) in cfg.check.iter() {
        if check.steps.is_empty() {
            return Err(DeepCheckError::ConfigError(format!(
                "check '{}' must define at least one [[check.{}.step]]",
                name, name
            )));
        }

        let mut seen = HashSet::new();
        for step in check.steps.iter() {
            if !seen.insert(step.name.as_str()) {
                return Err(DeepCheckError::ConfigError(format!(
                    "check '{}' has duplicate step '{}'",
                    name, step.name
                )));
            }
            if step.latency_ms == 0 {
                return Err(DeepCheckError::ConfigError(format!(
                    "step '{}' of check '{}' must have latency_ms >= 1 (got 0)",
                    step.name, name
                )));
            }
            if step.cmd.trim().is_empty() {
                return Err(DeepCheckError::ConfigError(format!(
                    "step '{}' of check '{}' has an empty cmd",
                    step.name, name
                )));
            }
        }
    }
    Ok(())
}
