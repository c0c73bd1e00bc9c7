// src/lib.rs

//! craftops: supervised, throttled edit jobs for live game worlds.
//!
//! The core is the [`engine::EditJobEngine`]: submitted command lists
//! (set/fill/replace/paste/clone) become jobs driven by [`runner`] tasks
//! that apply commands in batches through an external [`exec::BlockExecutor`],
//! while the [`throttle`] controller reacts to live MSPT/TPS samples from a
//! [`metrics::MetricsSource`] to keep the host simulation responsive. Every
//! executed command lands in the [`audit`] log.
//!
//! Jobs are process-lifetime only; the audit log is the only persisted
//! state.

pub mod audit;
pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod metrics;
pub mod runner;
pub mod throttle;
pub mod types;

use std::sync::Arc;

use crate::audit::SqliteAuditStore;

pub use command::{Command, CommandContext, CommandKind, CommandPayload};
pub use config::EngineConfig;
pub use engine::{AllowAll, EditJobEngine, PermissionGate};
pub use errors::{CraftopsError, Result};
pub use job::{Job, JobId, JobPolicy, JobStats};
pub use metrics::{MetricsSample, MetricsSource};
pub use types::{JobStatus, RunMode};

/// Wire up an engine backed by the sqlite audit store from `config`.
///
/// This is the production assembly; embedders with their own audit backend
/// construct [`EditJobEngine`] directly.
pub fn engine_from_config(
    config: EngineConfig,
    executor: Arc<dyn exec::BlockExecutor>,
    permissions: Arc<dyn PermissionGate>,
    metrics: Option<Arc<dyn MetricsSource>>,
) -> Result<EditJobEngine> {
    let audit = Arc::new(SqliteAuditStore::from_config(&config.audit)?);
    Ok(EditJobEngine::new(
        config,
        executor,
        audit,
        permissions,
        metrics,
    ))
}
