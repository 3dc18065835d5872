// src/sink/record.rs

//! Persisted shape of a finished run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::run::result::add_elapsed;
use crate::run::{RunResult, StepResult, aggregate_status};
use crate::types::{RunMethod, RunStatus};

/// One finished run, keyed by a fresh identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub check: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub run_method: RunMethod,
    pub steps: Vec<StepRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub status: RunStatus,
    pub fail_reason: Option<String>,
}

impl RunRecord {
    pub fn from_result(id: Uuid, run_method: RunMethod, result: &RunResult) -> Self {
        Self {
            id,
            check: result.check_name().to_string(),
            started_at: result.started_at,
            elapsed_ms: result.elapsed_ms,
            run_method,
            steps: result.steps.iter().map(StepRecord::from).collect(),
        }
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        add_elapsed(self.started_at, self.elapsed_ms)
    }

    pub fn status(&self) -> RunStatus {
        aggregate_status(self.steps.iter().map(|s| s.status))
    }
}

/// A run with at least one explicitly explained failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRun {
    pub id: Uuid,
    pub check: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// First non-blank reason among the failed steps.
    pub fail_reason: String,
}

impl FailedRun {
    /// `None` unless some step is `Failed` with a non-blank reason.
    pub fn from_record(record: &RunRecord) -> Option<Self> {
        let fail_reason = record
            .steps
            .iter()
            .filter(|s| s.status == RunStatus::Failed)
            .filter_map(|s| s.fail_reason.as_deref())
            .find(|r| !r.trim().is_empty())?;

        Some(Self {
            id: record.id,
            check: record.check.clone(),
            started_at: record.started_at,
            elapsed_ms: record.elapsed_ms,
            fail_reason: fail_reason.to_string(),
        })
    }
}

impl From<&StepResult> for StepRecord {
    fn from(step: &StepResult) -> Self {
        Self {
            step: step.step.name.clone(),
            started_at: step.started_at,
            elapsed_ms: step.elapsed_ms,
            status: step.status,
            fail_reason: step.fail_reason.clone(),
        }
    }
}
