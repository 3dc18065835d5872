// src/run/result.rs

//! Immutable run/step result values produced by the builder.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::run::definition::{RunDefinition, StepDefinition};
use crate::types::RunStatus;

/// Default reason recorded for steps that were never timed.
pub const NEVER_RUN_REASON: &str = "Never run";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub step: StepDefinition,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub status: RunStatus,
    /// Always set for `Failed` and `NeverRun`, never for `Ok`.
    pub fail_reason: Option<String>,
}

impl StepResult {
    pub(crate) fn never_run(step: &StepDefinition, reason: impl Into<String>) -> Self {
        Self {
            step: step.clone(),
            started_at: Utc::now(),
            elapsed_ms: 0,
            status: RunStatus::NeverRun,
            fail_reason: Some(reason.into()),
        }
    }

    pub(crate) fn failed(
        step: &StepDefinition,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            step: step.clone(),
            started_at,
            elapsed_ms,
            status: RunStatus::Failed,
            fail_reason: Some(reason.into()),
        }
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        add_elapsed(self.started_at, self.elapsed_ms)
    }
}

/// Result of one check run. One entry per defined step, in definition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub definition: Arc<RunDefinition>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub steps: Vec<StepResult>,
}

impl RunResult {
    pub fn check_name(&self) -> &str {
        &self.definition.name
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        add_elapsed(self.started_at, self.elapsed_ms)
    }

    /// `NeverRun` if every step is NeverRun, `Ok` if every step is Ok,
    /// `Failed` for anything else.
    pub fn status(&self) -> RunStatus {
        aggregate_status(self.steps.iter().map(|s| s.status))
    }

    /// Reason of the first `Failed` step in definition order.
    pub fn fail_reason(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.status == RunStatus::Failed)
            .and_then(|s| s.fail_reason.as_deref())
    }
}

/// Derive a run-level status from its step statuses.
///
/// An empty iterator counts as `NeverRun`.
pub fn aggregate_status(statuses: impl IntoIterator<Item = RunStatus>) -> RunStatus {
    let mut all_never_run = true;
    let mut all_ok = true;

    for status in statuses {
        all_never_run &= status == RunStatus::NeverRun;
        all_ok &= status == RunStatus::Ok;
    }

    if all_never_run {
        RunStatus::NeverRun
    } else if all_ok {
        RunStatus::Ok
    } else {
        RunStatus::Failed
    }
}

/// `started_at + elapsed_ms`, saturating at the largest representable time.
pub(crate) fn add_elapsed(started_at: DateTime<Utc>, elapsed_ms: u64) -> DateTime<Utc> {
    i64::try_from(elapsed_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|d| started_at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
