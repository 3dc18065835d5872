// src/runner/mod.rs

//! Running checks by name.
//!
//! - [`orchestrator`] resolves a check, executes it, turns errors into a
//!   best-effort result, and stores/broadcasts whatever result it got.
//! - [`guard`] wraps any runner so only one run per check name is in flight.
//! - [`lock`] is the keyed try-lock the guard uses.
//! - [`registry`] maps check names to checks.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::run::RunResult;
use crate::types::RunMethod;

pub mod guard;
pub mod lock;
pub mod orchestrator;
pub mod registry;

pub use guard::{ALREADY_RUNNING_REASON, ExclusiveRunner, lock_key};
pub use lock::{KeyedLock, LocalKeyedLock, LocalLockGuard};
pub use orchestrator::Orchestrator;
pub use registry::CheckRegistry;

/// Execute a check by name.
///
/// Implemented by [`Orchestrator`] and by [`ExclusiveRunner`], which can be
/// substituted for each other.
pub trait CheckRunner: Send + Sync {
    fn execute_by_name<'a>(
        &'a self,
        name: &'a str,
        method: RunMethod,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>>;
}

impl<T: CheckRunner + ?Sized> CheckRunner for std::sync::Arc<T> {
    fn execute_by_name<'a>(
        &'a self,
        name: &'a str,
        method: RunMethod,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        (**self).execute_by_name(name, method)
    }
}
