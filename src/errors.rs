// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeepCheckError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid run definition: {0}")]
    InvalidDefinition(String),

    #[error("Run is already finished")]
    RunFinished,

    #[error("Step index {index} is out of range for a run with {len} steps")]
    StepOutOfRange { index: usize, len: usize },

    #[error("Check not found: {0}")]
    CheckNotFound(String),

    #[error("Check '{check}' failed: {source:#}")]
    CheckFailed {
        check: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DeepCheckError>;
