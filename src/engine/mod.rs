// src/engine/mod.rs

//! The edit job engine facade.
//!
//! `EditJobEngine` is what the control layer (HTTP or otherwise) talks to:
//! it owns the job registry, wires collaborators into runners, and exposes
//! the admission and control operations. It never mutates world blocks
//! itself and it performs no transport concerns; both stay behind the
//! injected [`BlockExecutor`] / control layer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::audit::{AuditPage, AuditQuery, AuditSink};
use crate::command::{Command, CommandPayload};
use crate::config::EngineConfig;
use crate::errors::{CraftopsError, Result};
use crate::exec::BlockExecutor;
use crate::job::{Job, JobHandle, JobId, JobRegistry};
use crate::metrics::{spawn_metrics_ticker, MetricsSample, MetricsSource, MetricsTickerHandle};
use crate::runner::{run_job, RunnerDeps};
use crate::throttle;
use crate::types::{JobStatus, RunMode};

/// Permission node required to submit edit jobs.
pub const PERMISSION_EDIT: &str = "craftops.edit";

/// Permission node required to revert finished jobs.
pub const PERMISSION_REVERT: &str = "craftops.revert";

/// Policy adapter consulted before a job is admitted.
///
/// Backed in production by the server's permission plugin; the engine only
/// asks yes/no questions about identity/node pairs.
pub trait PermissionGate: Send + Sync {
    fn has_permission<'a>(
        &'a self,
        identity: &'a str,
        node: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + 'a>>;
}

/// Gate that admits everyone. For setups where permissions are enforced
/// upstream, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn has_permission<'a>(
        &'a self,
        _identity: &'a str,
        _node: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + 'a>> {
        Box::pin(async { Ok(true) })
    }
}

pub struct EditJobEngine {
    registry: JobRegistry,
    executor: Arc<dyn BlockExecutor>,
    audit: Arc<dyn AuditSink>,
    permissions: Arc<dyn PermissionGate>,
    /// Default metrics feed handed to every runner. Per-job tickers can be
    /// attached on top via [`start_metrics_ticker`](Self::start_metrics_ticker).
    metrics: Option<Arc<dyn MetricsSource>>,
    tickers: Mutex<HashMap<JobId, MetricsTickerHandle>>,
    config: EngineConfig,
}

impl EditJobEngine {
    pub fn new(
        config: EngineConfig,
        executor: Arc<dyn BlockExecutor>,
        audit: Arc<dyn AuditSink>,
        permissions: Arc<dyn PermissionGate>,
        metrics: Option<Arc<dyn MetricsSource>>,
    ) -> Self {
        Self {
            registry: JobRegistry::new(),
            executor,
            audit,
            permissions,
            metrics,
            tickers: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Admit and start a new edit job.
    ///
    /// Admission is all-or-nothing: the permission gate, the non-empty
    /// check, and every payload's resolution through the command variant
    /// registry happen before a Job exists. The returned snapshot is
    /// `queued`; the spawned runner transitions it to `running` immediately.
    pub async fn submit(
        &self,
        world_id: impl Into<String>,
        created_by: impl Into<String>,
        payloads: Vec<CommandPayload>,
    ) -> Result<Job> {
        let world_id = world_id.into();
        let created_by = created_by.into();

        self.check_permission(&created_by, PERMISSION_EDIT).await?;

        if payloads.is_empty() {
            return Err(CraftopsError::EmptyCommandList);
        }
        let commands: Vec<Command> = payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| Command::from_payload(index, payload))
            .collect::<Result<_>>()?;

        let job = Job::new(
            world_id,
            created_by,
            RunMode::Apply,
            None,
            commands,
            self.config.policy.job_policy(),
            self.config.policy.batch_size_start,
            self.config.policy.delay_ms_start,
        );

        self.spawn_run(job)
    }

    pub fn get(&self, id: JobId) -> Result<Job> {
        self.registry
            .snapshot(id)
            .ok_or(CraftopsError::JobNotFound(id))
    }

    pub fn list(&self) -> Vec<Job> {
        self.registry.list()
    }

    /// Pause a running job. A no-op (not an error) from any other state.
    pub fn pause(&self, id: JobId) -> Result<Job> {
        let handle = self.handle(id)?;
        let changed = handle.pause();
        debug!(job = %id, changed, "pause requested");
        Ok(handle.snapshot())
    }

    /// Resume a paused job. A no-op from any other state.
    pub fn resume(&self, id: JobId) -> Result<Job> {
        let handle = self.handle(id)?;
        let changed = handle.resume();
        debug!(job = %id, changed, "resume requested");
        Ok(handle.snapshot())
    }

    /// Cancel a job. Takes effect at the runner's next cooperative check
    /// point; a no-op on already-terminal jobs.
    pub fn cancel(&self, id: JobId) -> Result<Job> {
        let handle = self.handle(id)?;
        let changed = handle.cancel();
        if changed {
            info!(job = %id, "job canceled");
        }
        Ok(handle.snapshot())
    }

    /// Start a revert of a finished forward job.
    ///
    /// Creates and runs a NEW Revert-mode job over the source job's command
    /// list; the source job's terminal status is left untouched. Legal only
    /// for `completed` or `failed` Apply-mode jobs.
    pub async fn revert(&self, id: JobId) -> Result<Job> {
        let handle = self.handle(id)?;
        let source = handle.snapshot();

        self.check_permission(&source.created_by, PERMISSION_REVERT)
            .await?;

        let revertible = source.mode == RunMode::Apply
            && matches!(source.status, JobStatus::Completed | JobStatus::Failed);
        if !revertible {
            return Err(CraftopsError::NotRevertible {
                id,
                status: source.status,
            });
        }

        let commands = handle.with_job(|j| j.commands_cloned());
        let job = Job::new(
            source.world_id,
            source.created_by,
            RunMode::Revert,
            Some(id),
            commands,
            self.config.policy.job_policy(),
            self.config.policy.batch_size_start,
            self.config.policy.delay_ms_start,
        );

        info!(job = %job.id, source_job = %id, "revert job admitted");
        self.spawn_run(job)
    }

    /// Manually inject one metrics sample, equivalent to one throttle
    /// controller evaluation against the job.
    pub fn push_metrics(&self, id: JobId, sample: MetricsSample) -> Result<Job> {
        let handle = self.handle(id)?;
        throttle::apply_sample(&handle, &sample);
        Ok(handle.snapshot())
    }

    /// Attach a standing metrics ticker to a job. Replaces (and stops) any
    /// previous ticker for the same job. `interval` falls back to the
    /// configured default.
    pub fn start_metrics_ticker(
        &self,
        id: JobId,
        source: Arc<dyn MetricsSource>,
        interval: Option<Duration>,
    ) -> Result<()> {
        let handle = self.handle(id)?;
        let interval =
            interval.unwrap_or(Duration::from_millis(self.config.metrics.ticker_interval_ms));
        let ticker = spawn_metrics_ticker(handle, source, interval);

        let mut tickers = self.lock_tickers();
        if let Some(mut previous) = tickers.insert(id, ticker) {
            debug!(job = %id, "replacing existing metrics ticker");
            previous.stop();
        }
        Ok(())
    }

    /// Stop a job's metrics ticker. Returns whether one was running.
    pub fn stop_metrics_ticker(&self, id: JobId) -> Result<bool> {
        // Distinguish "unknown job" from "no ticker attached".
        self.handle(id)?;
        let mut tickers = self.lock_tickers();
        match tickers.remove(&id) {
            Some(mut ticker) => {
                ticker.stop();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Query the audit log.
    pub async fn audit_log(&self, query: AuditQuery) -> Result<AuditPage> {
        Ok(self.audit.query(query).await?)
    }

    fn handle(&self, id: JobId) -> Result<Arc<JobHandle>> {
        self.registry.get(id).ok_or(CraftopsError::JobNotFound(id))
    }

    fn lock_tickers(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, MetricsTickerHandle>> {
        self.tickers.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn check_permission(&self, identity: &str, node: &str) -> Result<()> {
        let allowed = self.permissions.has_permission(identity, node).await?;
        if allowed {
            Ok(())
        } else {
            Err(CraftopsError::PermissionDenied {
                identity: identity.to_string(),
                node: node.to_string(),
            })
        }
    }

    fn spawn_run(&self, job: Job) -> Result<Job> {
        let handle = self.registry.insert(job);
        let snapshot = handle.snapshot();
        info!(
            job = %snapshot.id,
            world = %snapshot.world_id,
            by = %snapshot.created_by,
            mode = %snapshot.mode,
            estimated_blocks = snapshot.stats.estimated_blocks,
            "job admitted"
        );

        let deps = RunnerDeps {
            executor: Arc::clone(&self.executor),
            metrics: self.metrics.clone(),
            audit: Arc::clone(&self.audit),
        };
        let poll_interval = Duration::from_millis(self.config.runner.poll_interval_ms);
        tokio::spawn(run_job(handle, deps, poll_interval));

        Ok(snapshot)
    }
}
