// src/runner.rs

//! Drives one job from `queued` to a terminal state.
//!
//! Each running job is one spawned task executing this loop:
//!
//! - cooperative gate before every batch (cancel stops, pause waits),
//! - strictly sequential command execution through the external executor,
//! - cancellation re-checked before every command,
//! - one metrics sample + throttle evaluation per completed batch,
//! - the tuned inter-batch delay as backpressure.
//!
//! The pause wait is a `Notify`-assisted poll with a bounded interval, so
//! an external status change is observed within one interval even if the
//! wakeup is missed. Commands never execute concurrently within a job;
//! later commands may depend on world state left by earlier ones.

use std::sync::Arc;
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditSink, NewAuditEntry};
use crate::command::{Command, CommandContext};
use crate::exec::BlockExecutor;
use crate::job::{JobHandle, JobId};
use crate::metrics::MetricsSource;
use crate::throttle;
use crate::types::{JobStatus, RunMode};

/// External collaborators a run needs.
pub struct RunnerDeps {
    pub executor: Arc<dyn BlockExecutor>,
    /// When present, one sample is pulled per completed batch and fed to
    /// the throttle controller.
    pub metrics: Option<Arc<dyn MetricsSource>>,
    pub audit: Arc<dyn AuditSink>,
}

/// How a run ended. The terminal status on the job record is authoritative;
/// this is returned for callers that drive the runner directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
    Canceled,
}

enum Gate {
    Proceed,
    Canceled,
}

struct ExecutedCommand {
    index: usize,
    duration_ms: u64,
    finished_at: OffsetDateTime,
}

/// Run `job` to a terminal state.
///
/// The handle reference is transient: it is dropped when this future
/// resolves, never retained past job termination.
pub async fn run_job(job: Arc<JobHandle>, deps: RunnerDeps, poll_interval: Duration) -> RunOutcome {
    let job_id = job.id();
    let (mode, world_id, created_by, estimated_blocks, commands) = job.with_job(|j| {
        (
            j.mode,
            j.world_id.clone(),
            j.created_by.clone(),
            j.stats.estimated_blocks,
            j.commands_cloned(),
        )
    });

    if !job.start() {
        // The only legal pre-run transition away from `queued` is a cancel.
        debug!(job = %job_id, "job no longer queued at run start; nothing to do");
        return RunOutcome::Canceled;
    }

    info!(
        job = %job_id,
        world = %world_id,
        mode = %mode,
        commands = commands.len(),
        estimated_blocks,
        "job run started"
    );

    let context = CommandContext {
        world_id,
        estimated_blocks,
    };

    let total = commands.len();
    let mut index = 0;
    let mut executed: Vec<ExecutedCommand> = Vec::new();
    let mut outcome = RunOutcome::Completed;

    'run: while index < total {
        match wait_until_runnable(&job, poll_interval).await {
            Gate::Canceled => {
                outcome = RunOutcome::Canceled;
                break 'run;
            }
            Gate::Proceed => {}
        }

        // Read fresh: the throttle controller may have just retuned it.
        let (batch_size, _) = job.batch_parameters();
        let end = (index + batch_size.max(1)).min(total);
        debug!(job = %job_id, from = index, to = end, "executing batch");

        while index < end {
            if job.is_canceled() {
                outcome = RunOutcome::Canceled;
                break 'run;
            }

            let command = &commands[index];
            let started = Instant::now();
            let result = match mode {
                RunMode::Apply => deps.executor.apply(command, &context).await,
                RunMode::Revert => deps.executor.revert(command, &context).await,
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    if mode == RunMode::Apply {
                        // No-op if a cancel won the race during the call;
                        // progress freezes with the terminal status.
                        job.add_done_blocks(command.blocks());
                    }
                    executed.push(ExecutedCommand {
                        index,
                        duration_ms,
                        finished_at: OffsetDateTime::now_utc(),
                    });
                    index += 1;
                }
                Err(err) => {
                    error!(
                        job = %job_id,
                        command = index,
                        kind = %command.kind(),
                        error = %err,
                        "command execution failed"
                    );
                    let failed = job.fail(format!(
                        "command {index} ({}) failed: {err}",
                        command.kind()
                    ));
                    // `fail` loses only to an already-terminal status, i.e.
                    // a cancel that landed while the command was in flight.
                    outcome = if failed {
                        RunOutcome::Failed
                    } else {
                        RunOutcome::Canceled
                    };
                    break 'run;
                }
            }
        }

        if index >= total {
            break;
        }

        if let Some(metrics) = &deps.metrics {
            match metrics.sample().await {
                Ok(sample) => {
                    throttle::apply_sample(&job, &sample);
                }
                Err(err) => {
                    debug!(
                        job = %job_id,
                        error = %err,
                        "metrics sample failed; keeping previous throttle"
                    );
                }
            }
        }

        let (_, delay_ms) = job.batch_parameters();
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    if outcome == RunOutcome::Completed && !job.complete() {
        // A cancel landed during the final command.
        outcome = RunOutcome::Canceled;
    }

    info!(
        job = %job_id,
        outcome = ?outcome,
        executed = executed.len(),
        "job run finished"
    );

    // Every executed command of a forward run must be attributable, even
    // when the run ended failed or canceled partway through.
    if mode == RunMode::Apply && !executed.is_empty() {
        emit_audit_records(&*deps.audit, job_id, &created_by, &context, &commands, &executed).await;
    }

    outcome
}

/// Block until the job may proceed, or report cancellation.
///
/// Paused jobs wait on the status-change notification with a bounded
/// `poll_interval` timeout and re-check cancellation on every wake.
async fn wait_until_runnable(job: &JobHandle, poll_interval: Duration) -> Gate {
    loop {
        match job.status() {
            JobStatus::Canceled => return Gate::Canceled,
            JobStatus::Paused => {
                tokio::select! {
                    _ = job.status_changed() => {}
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            _ => return Gate::Proceed,
        }
    }
}

async fn emit_audit_records(
    audit: &dyn AuditSink,
    job_id: JobId,
    created_by: &str,
    context: &CommandContext,
    commands: &[Command],
    executed: &[ExecutedCommand],
) {
    for record in executed {
        let command = &commands[record.index];
        let entry = NewAuditEntry {
            job_id,
            user_id: created_by.to_string(),
            world_id: context.world_id.clone(),
            command_type: command.kind().as_str().to_string(),
            params: command.params().clone(),
            estimated_blocks: command.blocks(),
            duration_ms: record.duration_ms,
            created_at: record.finished_at,
        };
        if let Err(err) = audit.record(entry).await {
            // The job's terminal status stands; a lost audit row is logged,
            // not propagated.
            warn!(
                job = %job_id,
                command = record.index,
                error = %err,
                "failed to record audit entry"
            );
        }
    }
}
