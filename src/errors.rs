// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

use crate::job::JobId;
use crate::types::JobStatus;

#[derive(Error, Debug)]
pub enum CraftopsError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("unknown command type: {0}")]
    UnknownCommandType(String),

    #[error("command list is empty")]
    EmptyCommandList,

    #[error("command {index} ({kind}): missing required param `{param}`")]
    MissingParam {
        index: usize,
        kind: String,
        param: String,
    },

    #[error("command {index} ({kind}): invalid param `{param}`: {reason}")]
    InvalidParam {
        index: usize,
        kind: String,
        param: String,
        reason: String,
    },

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("job {id} cannot be reverted from status `{status}`")]
    NotRevertible { id: JobId, status: JobStatus },

    #[error("permission denied: `{identity}` lacks `{node}`")]
    PermissionDenied { identity: String, node: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("audit store error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CraftopsError>;
