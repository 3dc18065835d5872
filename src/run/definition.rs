// src/run/definition.rs

use serde::Serialize;

/// One named, latency-budgeted unit of work within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub name: String,
    pub description: String,
    /// Maximum allowed elapsed milliseconds before the step counts as failed.
    pub latency_budget_ms: u64,
}

impl StepDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        latency_budget_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            latency_budget_ms,
        }
    }
}

/// A named check: ordered steps plus an opaque schedule expression.
///
/// Step order is significant and fixed. Emptiness is rejected by config
/// validation and again by [`RunBuilder::new`](crate::run::RunBuilder::new).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunDefinition {
    pub name: String,
    pub description: String,
    /// Cron-like expression; interpreted by whatever schedules the check.
    pub schedule: String,
    pub steps: Vec<StepDefinition>,
}

impl RunDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schedule: impl Into<String>,
        steps: Vec<StepDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schedule: schedule.into(),
            steps,
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.name == name)
    }
}
