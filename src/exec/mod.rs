// src/exec/mod.rs

//! Check execution layer.
//!
//! - [`check`] defines the `Check` trait the runner executes.
//! - [`command`] provides `CommandCheck`, which runs each step as a shell
//!   command via `tokio::process::Command`.

pub mod check;
pub mod command;

pub use check::Check;
pub use command::CommandCheck;
