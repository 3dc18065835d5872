// src/runner/guard.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::warn;

use crate::errors::{DeepCheckError, Result};
use crate::run::{RunBuilder, RunResult};
use crate::runner::CheckRunner;
use crate::runner::lock::KeyedLock;
use crate::runner::registry::CheckRegistry;
use crate::types::RunMethod;

/// Reason recorded on the first step when a run collides with one in flight.
pub const ALREADY_RUNNING_REASON: &str = "Test is already running";

/// Lock key for a check name.
pub fn lock_key(name: &str) -> String {
    format!("check-lock-{name}")
}

/// Wraps a runner so that at most one run per check name is in flight.
///
/// A second caller for a busy name is not queued: it immediately gets a
/// result whose first step is never-run with [`ALREADY_RUNNING_REASON`] and
/// whose remaining steps are never-run. The key is released when the inner
/// run returns, fails, or its future is dropped.
pub struct ExclusiveRunner<R, L> {
    inner: R,
    lock: L,
    registry: Arc<CheckRegistry>,
}

impl<R: CheckRunner, L: KeyedLock> ExclusiveRunner<R, L> {
    pub fn new(inner: R, lock: L, registry: Arc<CheckRegistry>) -> Self {
        Self {
            inner,
            lock,
            registry,
        }
    }

    fn already_running(&self, name: &str) -> Result<RunResult> {
        let check = self
            .registry
            .get(name)
            .ok_or_else(|| DeepCheckError::CheckNotFound(name.to_string()))?;

        let mut builder = RunBuilder::new(check.definition())?;
        builder.fail_step(ALREADY_RUNNING_REASON)?;
        Ok(builder.finish_run())
    }
}

impl<R: CheckRunner, L: KeyedLock> CheckRunner for ExclusiveRunner<R, L> {
    fn execute_by_name<'a>(
        &'a self,
        name: &'a str,
        method: RunMethod,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        Box::pin(async move {
            let Some(_held) = self.lock.try_acquire(&lock_key(name)) else {
                warn!(check = %name, "check is already running");
                return self.already_running(name);
            };

            self.inner.execute_by_name(name, method).await
        })
    }
}
