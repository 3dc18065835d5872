use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use deepcheck::exec::Check;
use deepcheck::run::{RunBuilder, RunDefinition, RunResult};
use tokio::sync::Notify;

/// What a [`FakeCheck`] does when executed.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Start and close every step.
    Pass,
    /// Start the first step and fail it with the message.
    FailFirstStep(String),
    /// Return an error without producing a result.
    Error(String),
    /// Start the first step, wait for `release`, then close every step.
    WaitFor(Arc<Notify>),
}

/// A check that never touches a process.
///
/// - counts how many times it was executed
/// - signals `started` each time execution begins.
pub struct FakeCheck {
    definition: Arc<RunDefinition>,
    behaviour: FakeBehaviour,
    executions: Arc<AtomicUsize>,
    started: Arc<Notify>,
}

impl FakeCheck {
    pub fn new(definition: Arc<RunDefinition>, behaviour: FakeBehaviour) -> Self {
        Self {
            definition,
            behaviour,
            executions: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(Notify::new()),
        }
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Resolves once execution has begun (a permit is kept if it already did).
    pub fn started(&self) -> Arc<Notify> {
        Arc::clone(&self.started)
    }
}

impl Check for FakeCheck {
    fn definition(&self) -> Arc<RunDefinition> {
        Arc::clone(&self.definition)
    }

    fn execute(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<RunResult>> + Send + '_>> {
        Box::pin(async move {
            self.executions.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();

            if let FakeBehaviour::Error(message) = &self.behaviour {
                return Err(anyhow!(message.clone()));
            }

            let mut builder = RunBuilder::new(Arc::clone(&self.definition))?;
            match &self.behaviour {
                FakeBehaviour::Pass => {
                    for _ in self.definition.steps.iter() {
                        builder.start_next_step()?;
                        builder.step_done()?;
                    }
                }
                FakeBehaviour::FailFirstStep(message) => {
                    builder.start_next_step()?;
                    builder.fail_step(message.clone())?;
                }
                FakeBehaviour::Error(_) => unreachable!("handled above"),
                FakeBehaviour::WaitFor(release) => {
                    builder.start_next_step()?;
                    release.notified().await;
                    for _ in self.definition.steps.iter().skip(1) {
                        builder.start_next_step()?;
                    }
                }
            }
            Ok(builder.finish_run())
        })
    }
}
