// src/sink/mod.rs

//! Where finished runs go: persistence ([`store`]) and live fan-out
//! ([`broadcast`]). Both work on [`RunRecord`], the persisted shape of a
//! run result.

pub mod broadcast;
pub mod record;
pub mod store;

pub use broadcast::{ChannelBroadcaster, NoopBroadcaster, RunBroadcaster};
pub use record::{FailedRun, RunRecord, StepRecord};
pub use store::{FileRunStore, MemoryRunStore, RunQuery, RunStore, StepKey};
