// src/config/model.rs

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::run::{RunDefinition, StepDefinition};
use crate::types::StoreMode;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// store = "file"
///
/// [retention]
/// success_max_age_hours = 24
/// failed_max_age_days = 7
///
/// [check.homepage]
/// description = "Load the landing page"
/// schedule = "*/5 * * * *"
///
/// [[check.homepage.step]]
/// name = "fetch"
/// latency_ms = 2000
/// cmd = "curl -sf https://example.com"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub retention: RetentionSection,

    /// All checks from `[check.<name>]`, keyed by check name.
    #[serde(default)]
    pub check: BTreeMap<String, CheckConfig>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    retention: RetentionSection,
    check: BTreeMap<String, CheckConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        retention: RetentionSection,
        check: BTreeMap<String, CheckConfig>,
    ) -> Self {
        Self {
            config,
            retention,
            check,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn retention(&self) -> &RetentionSection {
        &self.retention
    }

    pub fn checks(&self) -> &BTreeMap<String, CheckConfig> {
        &self.check
    }

    /// Run definition for the named check.
    pub fn definition(&self, name: &str) -> Option<RunDefinition> {
        self.check.get(name).map(|c| c.to_definition(name))
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"memory"` (default) or `"file"`.
    #[serde(default)]
    pub store: StoreMode,

    /// Where the file store keeps its records, relative to the config file.
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

fn default_store_path() -> String {
    ".deepcheck/runs.jsonl".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            store: StoreMode::default(),
            store_path: default_store_path(),
        }
    }
}

/// `[retention]` section: how long finished runs are kept.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetentionSection {
    /// Runs whose steps all passed are dropped after this many hours.
    #[serde(default = "default_success_max_age_hours")]
    pub success_max_age_hours: u64,

    /// Every other run is dropped after this many days.
    #[serde(default = "default_failed_max_age_days")]
    pub failed_max_age_days: u64,
}

fn default_success_max_age_hours() -> u64 {
    24
}

fn default_failed_max_age_days() -> u64 {
    7
}

impl Default for RetentionSection {
    fn default() -> Self {
        Self {
            success_max_age_hours: default_success_max_age_hours(),
            failed_max_age_days: default_failed_max_age_days(),
        }
    }
}

impl RetentionSection {
    /// `(success_cutoff, failed_cutoff)` relative to `now`.
    pub fn cutoffs(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let success = hours_before(now, self.success_max_age_hours);
        let failed = hours_before(now, self.failed_max_age_days.saturating_mul(24));
        (success, failed)
    }
}

fn hours_before(now: DateTime<Utc>, hours: u64) -> DateTime<Utc> {
    i64::try_from(hours)
        .ok()
        .and_then(TimeDelta::try_hours)
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// `[check.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub description: String,

    /// Cron expression for whatever schedules this check. Not interpreted here.
    #[serde(default)]
    pub schedule: String,

    /// Ordered `[[check.<name>.step]]` tables.
    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,
}

impl CheckConfig {
    pub fn to_definition(&self, name: &str) -> RunDefinition {
        RunDefinition::new(
            name,
            self.description.clone(),
            self.schedule.clone(),
            self.steps
                .iter()
                .map(|s| StepDefinition::new(s.name.clone(), s.description.clone(), s.latency_ms))
                .collect(),
        )
    }

    /// Shell commands in step order.
    pub fn commands(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.cmd.clone()).collect()
    }
}

/// `[[check.<name>.step]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Latency budget in milliseconds.
    pub latency_ms: u64,

    /// Shell command executed for this step.
    pub cmd: String,
}
