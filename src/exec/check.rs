// src/exec/check.rs

//! The `Check` abstraction.
//!
//! A check owns a [`RunDefinition`] and knows how to execute it, driving a
//! [`RunBuilder`](crate::run::RunBuilder) step by step. The runner only talks
//! to this trait, so tests can plug in checks that never touch a process.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::run::{RunDefinition, RunResult};

/// Something that can be executed as a named, stepped check.
///
/// `execute` returns an error only for failures the check could not record
/// itself; the runner turns those into a best-effort result.
pub trait Check: Send + Sync {
    fn definition(&self) -> Arc<RunDefinition>;

    fn execute(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<RunResult>> + Send + '_>>;
}
