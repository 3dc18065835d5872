use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outcome of a single step, and (derived) of a whole run.
///
/// - `NeverRun`: the step was never timed. Either an earlier failure or
///   never-run record advanced past it, or the run finished first.
/// - `Ok`: the step closed within its latency budget.
/// - `Failed`: the step failed explicitly or exceeded its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    NeverRun,
    Ok,
    Failed,
}

impl Default for RunStatus {
    fn default() -> Self {
        RunStatus::NeverRun
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::NeverRun => "NeverRun",
            RunStatus::Ok => "Ok",
            RunStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// How a run was started. Recorded alongside every persisted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunMethod {
    Manual,
    Scheduled,
}

impl Default for RunMethod {
    fn default() -> Self {
        RunMethod::Manual
    }
}

impl fmt::Display for RunMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMethod::Manual => f.write_str("Manual"),
            RunMethod::Scheduled => f.write_str("Scheduled"),
        }
    }
}

impl FromStr for RunMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(RunMethod::Manual),
            "scheduled" => Ok(RunMethod::Scheduled),
            other => Err(format!(
                "invalid run method: {other} (expected \"manual\" or \"scheduled\")"
            )),
        }
    }
}

/// Where finished run records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Append records to a JSON-lines file (`.deepcheck/runs.jsonl`).
    File,
    /// Keep records in memory only (lost on exit).
    Memory,
}

impl Default for StoreMode {
    fn default() -> Self {
        StoreMode::Memory
    }
}
