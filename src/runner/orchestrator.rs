// src/runner/orchestrator.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::errors::{DeepCheckError, Result};
use crate::run::{RunBuilder, RunDefinition, RunResult};
use crate::runner::CheckRunner;
use crate::runner::registry::CheckRegistry;
use crate::sink::{RunBroadcaster, RunRecord, RunStore};
use crate::types::RunMethod;

/// Resolves checks by name, executes them, and hands every produced result
/// to the store and the broadcaster.
///
/// If a check returns an error, a best-effort result is built (first
/// unreached step never-run with the error message, the rest never-run),
/// stored and broadcast, and then the error is returned as
/// [`DeepCheckError::CheckFailed`].
pub struct Orchestrator<S, B> {
    registry: Arc<CheckRegistry>,
    store: S,
    broadcaster: B,
}

impl<S: RunStore, B: RunBroadcaster> Orchestrator<S, B> {
    pub fn new(registry: Arc<CheckRegistry>, store: S, broadcaster: B) -> Self {
        Self {
            registry,
            store,
            broadcaster,
        }
    }

    async fn execute(&self, name: &str, method: RunMethod, run_id: Uuid) -> Result<RunResult> {
        let Some(check) = self.registry.get(name) else {
            warn!("check not found");
            return Err(DeepCheckError::CheckNotFound(name.to_string()));
        };

        let err = match check.execute().await {
            Ok(result) => {
                info!(
                    status = %result.status(),
                    elapsed_ms = result.elapsed_ms,
                    "check executed"
                );
                self.publish(run_id, method, &result);
                return Ok(result);
            }
            Err(err) => err,
        };

        let reason = format!("{err:#}");
        error!(error = %reason, "error executing check");

        match fallback_result(check.definition(), reason) {
            Ok(result) => self.publish(run_id, method, &result),
            Err(fallback_err) => {
                error!(error = %fallback_err, "could not build a result for the failed check");
            }
        }

        Err(DeepCheckError::CheckFailed {
            check: name.to_string(),
            source: err,
        })
    }

    /// Store then broadcast. Failures here are logged, never returned.
    fn publish(&self, run_id: Uuid, method: RunMethod, result: &RunResult) {
        let record = RunRecord::from_result(run_id, method, result);

        if let Err(err) = self.store.save(record.clone()) {
            error!(error = %format!("{err:#}"), "failed to store run");
        }
        if let Err(err) = self.broadcaster.publish(&record) {
            warn!(error = %format!("{err:#}"), "failed to broadcast run");
        }
    }
}

/// First step never-run with `reason`, the rest never-run.
fn fallback_result(definition: Arc<RunDefinition>, reason: String) -> Result<RunResult> {
    let mut builder = RunBuilder::new(definition)?;
    builder.fail_step(reason)?;
    Ok(builder.finish_run())
}

impl<S: RunStore, B: RunBroadcaster> CheckRunner for Orchestrator<S, B> {
    fn execute_by_name<'a>(
        &'a self,
        name: &'a str,
        method: RunMethod,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        // Create the run id up front so every log line of this run carries it.
        let run_id = Uuid::now_v7();
        let span = info_span!("check_run", check = %name, method = %method, run_id = %run_id);

        Box::pin(self.execute(name, method, run_id).instrument(span))
    }
}
