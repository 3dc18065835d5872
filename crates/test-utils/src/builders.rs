#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use deepcheck::config::{
    CheckConfig, ConfigFile, ConfigSection, RawConfigFile, RetentionSection, StepConfig,
};
use deepcheck::run::{RunDefinition, StepDefinition};
use deepcheck::types::StoreMode;

/// Definition named `name` with steps `step1..stepN`, one per budget.
pub fn definition(name: &str, budgets_ms: &[u64]) -> Arc<RunDefinition> {
    let steps = budgets_ms
        .iter()
        .enumerate()
        .map(|(i, budget)| StepDefinition::new(format!("step{}", i + 1), "desc", *budget))
        .collect();
    Arc::new(RunDefinition::new(name, "d", "* * * * *", steps))
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                retention: RetentionSection::default(),
                check: BTreeMap::new(),
            },
        }
    }

    pub fn with_check(mut self, name: &str, check: CheckConfig) -> Self {
        self.config.check.insert(name.to_string(), check);
        self
    }

    pub fn with_store(mut self, mode: StoreMode, path: &str) -> Self {
        self.config.config.store = mode;
        self.config.config.store_path = path.to_string();
        self
    }

    pub fn with_retention(mut self, success_max_age_hours: u64, failed_max_age_days: u64) -> Self {
        self.config.retention = RetentionSection {
            success_max_age_hours,
            failed_max_age_days,
        };
        self
    }

    /// The raw config, for tests that exercise validation themselves.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CheckConfig`.
pub struct CheckConfigBuilder {
    check: CheckConfig,
}

impl CheckConfigBuilder {
    pub fn new() -> Self {
        Self {
            check: CheckConfig {
                description: String::new(),
                schedule: String::new(),
                steps: vec![],
            },
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.check.description = description.to_string();
        self
    }

    pub fn schedule(mut self, schedule: &str) -> Self {
        self.check.schedule = schedule.to_string();
        self
    }

    pub fn step(mut self, name: &str, latency_ms: u64, cmd: &str) -> Self {
        self.check.steps.push(StepConfig {
            name: name.to_string(),
            description: String::new(),
            latency_ms,
            cmd: cmd.to_string(),
        });
        self
    }

    pub fn build(self) -> CheckConfig {
        self.check
    }
}

impl Default for CheckConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
