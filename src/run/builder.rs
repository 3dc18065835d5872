// src/run/builder.rs

//! Step-by-step run builder.
//!
//! A check drives one [`RunBuilder`] through a sequence of
//! `start_next_step` / `step_done` / `fail_step` calls and finally
//! `finish_run`, which yields the [`RunResult`].
//!
//! Internally the builder is a small state machine with three states:
//! - `Root`: no step is timing. Holds the closed steps so far and the index of
//!   the next step definition.
//! - `StepOpen`: exactly one step is timing. Holds the root snapshot (index
//!   already advanced past the open step) that will receive the result.
//! - `Finished`: terminal, holds the computed result.
//!
//! Every operation takes the current state out of its slot and puts back the
//! next one. The builder is owned by a single execution and is not
//! synchronised.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::errors::{DeepCheckError, Result};
use crate::run::definition::RunDefinition;
use crate::run::latency;
use crate::run::result::{NEVER_RUN_REASON, RunResult, StepResult};

#[derive(Debug, Default)]
struct Root {
    closed: Vec<StepResult>,
    next: usize,
}

#[derive(Debug)]
struct OpenStep {
    root: Root,
    index: usize,
    started_at: DateTime<Utc>,
    clock: Instant,
}

#[derive(Debug)]
enum State {
    Root(Root),
    StepOpen(OpenStep),
    Finished(RunResult),
}

/// A state that still accepts step operations.
enum Active {
    Root(Root),
    StepOpen(OpenStep),
}

/// How an open step is closed.
enum Close {
    Latency,
    Failed(String),
}

#[derive(Debug)]
pub struct RunBuilder {
    definition: Arc<RunDefinition>,
    started_at: DateTime<Utc>,
    clock: Instant,
    state: State,
}

impl RunBuilder {
    /// Start a new run for `definition`.
    ///
    /// Fails with [`DeepCheckError::InvalidDefinition`] if the definition has
    /// no steps.
    pub fn new(definition: Arc<RunDefinition>) -> Result<Self> {
        if definition.steps.is_empty() {
            return Err(DeepCheckError::InvalidDefinition(format!(
                "check '{}' must have at least one step",
                definition.name
            )));
        }

        Ok(Self {
            definition,
            started_at: Utc::now(),
            clock: Instant::now(),
            state: State::Root(Root::default()),
        })
    }

    pub fn definition(&self) -> &Arc<RunDefinition> {
        &self.definition
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished(_))
    }

    /// Open the next step and start timing it.
    ///
    /// If a step is already open it is closed first as if `step_done` had
    /// been called, so consecutive calls are valid.
    pub fn start_next_step(&mut self) -> Result<()> {
        let mut root = self.take_root()?;

        let index = root.next;
        if index >= self.definition.steps.len() {
            self.state = State::Root(root);
            return Err(self.out_of_range(index));
        }
        root.next += 1;

        trace!(
            check = %self.definition.name,
            step = %self.definition.steps[index].name,
            "step started"
        );

        self.state = State::StepOpen(OpenStep {
            root,
            index,
            started_at: Utc::now(),
            clock: Instant::now(),
        });
        Ok(())
    }

    /// Close the open step, checking it against its latency budget.
    ///
    /// Without an open step, the next step is recorded as never run.
    pub fn step_done(&mut self) -> Result<()> {
        match self.take_active()? {
            Active::StepOpen(open) => {
                self.state = State::Root(self.close_step(open, Close::Latency));
                Ok(())
            }
            Active::Root(root) => self.skip_step(root, NEVER_RUN_REASON.to_string()),
        }
    }

    /// Fail the open step with `message`.
    ///
    /// Without an open step, the next step is recorded as *never run* with
    /// `message` as its reason, not as failed.
    pub fn fail_step(&mut self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        match self.take_active()? {
            Active::StepOpen(open) => {
                self.state = State::Root(self.close_step(open, Close::Failed(message)));
                Ok(())
            }
            Active::Root(root) => self.skip_step(root, message),
        }
    }

    /// Finalise the run and return its result.
    ///
    /// An open step is closed against its budget; steps not yet reached are
    /// recorded as never run. Calling this again returns the same result.
    pub fn finish_run(&mut self) -> RunResult {
        let root = match std::mem::replace(&mut self.state, State::Root(Root::default())) {
            State::Finished(result) => {
                self.state = State::Finished(result.clone());
                return result;
            }
            State::Root(root) => root,
            State::StepOpen(open) => self.close_step(open, Close::Latency),
        };

        let mut steps = root.closed;
        steps.extend(
            self.definition.steps[root.next..]
                .iter()
                .map(|step| StepResult::never_run(step, NEVER_RUN_REASON)),
        );

        let result = RunResult {
            definition: Arc::clone(&self.definition),
            started_at: self.started_at,
            elapsed_ms: elapsed_ms(self.clock),
            steps,
        };

        debug!(
            check = %self.definition.name,
            status = %result.status(),
            elapsed_ms = result.elapsed_ms,
            "run finished"
        );

        self.state = State::Finished(result.clone());
        result
    }

    /// Take the state out of its slot, leaving a finished state in place.
    fn take_active(&mut self) -> Result<Active> {
        match std::mem::replace(&mut self.state, State::Root(Root::default())) {
            State::Root(root) => Ok(Active::Root(root)),
            State::StepOpen(open) => Ok(Active::StepOpen(open)),
            finished @ State::Finished(_) => {
                self.state = finished;
                Err(DeepCheckError::RunFinished)
            }
        }
    }

    /// Take the state as a root, closing any open step against its budget.
    fn take_root(&mut self) -> Result<Root> {
        match self.take_active()? {
            Active::Root(root) => Ok(root),
            Active::StepOpen(open) => Ok(self.close_step(open, Close::Latency)),
        }
    }

    fn close_step(&self, open: OpenStep, close: Close) -> Root {
        let OpenStep {
            mut root,
            index,
            started_at,
            clock,
        } = open;
        let step = &self.definition.steps[index];
        let elapsed = elapsed_ms(clock);

        let result = match close {
            Close::Latency => latency::evaluate(started_at, elapsed, step),
            Close::Failed(message) => StepResult::failed(step, started_at, elapsed, message),
        };

        trace!(
            check = %self.definition.name,
            step = %step.name,
            status = %result.status,
            elapsed_ms = elapsed,
            "step closed"
        );

        root.closed.push(result);
        root
    }

    /// Record the next step as never run and advance past it.
    fn skip_step(&mut self, mut root: Root, reason: String) -> Result<()> {
        let index = root.next;
        let Some(step) = self.definition.steps.get(index) else {
            self.state = State::Root(root);
            return Err(self.out_of_range(index));
        };

        root.closed.push(StepResult::never_run(step, reason));
        root.next += 1;
        self.state = State::Root(root);
        Ok(())
    }

    fn out_of_range(&self, index: usize) -> DeepCheckError {
        DeepCheckError::StepOutOfRange {
            index,
            len: self.definition.steps.len(),
        }
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}
