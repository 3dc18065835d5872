// src/run/latency.rs

use chrono::{DateTime, Utc};

use crate::run::definition::StepDefinition;
use crate::run::result::StepResult;
use crate::types::RunStatus;

/// Close a timed step against its latency budget.
///
/// Elapsed time strictly greater than the budget fails the step; the reason
/// text is matched on by downstream consumers, so keep its wording stable.
pub fn evaluate(started_at: DateTime<Utc>, elapsed_ms: u64, step: &StepDefinition) -> StepResult {
    if elapsed_ms > step.latency_budget_ms {
        return StepResult::failed(
            step,
            started_at,
            elapsed_ms,
            format!(
                "Latency of {} ms exceeded the allowed latency of {} ms.",
                elapsed_ms, step.latency_budget_ms
            ),
        );
    }

    StepResult {
        step: step.clone(),
        started_at,
        elapsed_ms,
        status: RunStatus::Ok,
        fail_reason: None,
    }
}
