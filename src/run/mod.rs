// src/run/mod.rs

//! Check run model and the step-by-step run builder.
//!
//! - [`definition`] holds the immutable check/step definitions.
//! - [`latency`] closes a timed step against its budget.
//! - [`builder`] is the state machine a check drives while it executes.
//! - [`result`] holds the finished run/step values and status derivation.

pub mod builder;
pub mod definition;
pub mod latency;
pub mod result;

pub use builder::RunBuilder;
pub use definition::{RunDefinition, StepDefinition};
pub use result::{NEVER_RUN_REASON, RunResult, StepResult, aggregate_status};
