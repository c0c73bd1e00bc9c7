// src/throttle.rs

//! Adaptive throttle controller.
//!
//! A deliberately simple bang-bang controller with hysteresis, evaluated
//! once per completed batch (or per pushed/ticked metrics sample):
//!
//! 1. Availability gate: TPS below the pause threshold forces the job to
//!    pause; recovery auto-resumes it, but only if the pause was
//!    gate-induced. The gate is checked first and overrides tuning.
//! 2. Adaptive tuning: MSPT below the policy band grows the batch and
//!    shrinks the delay by fixed steps; above the band does the reverse.
//!    Inside the band nothing changes. That dead zone is the
//!    anti-oscillation mechanism and must be preserved exactly.
//!
//! [`evaluate`] is a pure function over plain data so it can be tested
//! without Tokio or a live job; [`apply_sample`] is the small glue that
//! feeds a sample through it under the job lock.

use tracing::{debug, info};

use crate::job::state::{JobPolicy, JobStats};
use crate::job::JobHandle;
use crate::metrics::MetricsSample;
use crate::types::JobStatus;

/// Fixed tuning step for `batch_size`.
pub const BATCH_SIZE_STEP: usize = 8;

/// Fixed tuning step for `delay_ms`.
pub const DELAY_MS_STEP: u64 = 25;

/// Status transition forced by the availability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoTransition {
    Pause,
    Resume,
}

/// Result of one controller evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleDecision {
    pub batch_size: usize,
    pub delay_ms: u64,
    pub transition: Option<AutoTransition>,
}

/// Evaluate the controller against one metrics sample.
///
/// Pure: no clock, no locks, no IO. Missing `tps`/`mspt` fields simply skip
/// the gate / tuning that would need them, keeping the previous values
/// (transient metrics failures are non-fatal by design).
pub fn evaluate(
    policy: &JobPolicy,
    stats: &JobStats,
    status: JobStatus,
    paused_by_throttle: bool,
    sample: &MetricsSample,
) -> ThrottleDecision {
    let mut batch_size = stats
        .batch_size
        .clamp(policy.batch_size_min, policy.batch_size_max);
    let mut delay_ms = stats.delay_ms.clamp(policy.delay_ms_min, policy.delay_ms_max);

    // Availability gate, checked first.
    let mut transition = None;
    if let Some(tps) = sample.tps {
        if tps < policy.tps_pause_threshold {
            if status == JobStatus::Running {
                transition = Some(AutoTransition::Pause);
            }
        } else if paused_by_throttle && status == JobStatus::Paused {
            transition = Some(AutoTransition::Resume);
        }
    }

    // Adaptive tuning. Skipped entirely the round the gate fires; the gate
    // overrides tuning.
    if transition.is_none() && policy.adaptive_throttle {
        if let Some(mspt) = sample.mspt {
            if mspt < policy.mspt_lower_bound {
                // Simulation has slack: push harder.
                batch_size = batch_size
                    .saturating_add(BATCH_SIZE_STEP)
                    .min(policy.batch_size_max);
                delay_ms = delay_ms
                    .saturating_sub(DELAY_MS_STEP)
                    .max(policy.delay_ms_min);
            } else if mspt > policy.mspt_upper_bound {
                // Simulation under load: back off.
                batch_size = batch_size
                    .saturating_sub(BATCH_SIZE_STEP)
                    .max(policy.batch_size_min);
                delay_ms = delay_ms
                    .saturating_add(DELAY_MS_STEP)
                    .min(policy.delay_ms_max);
            }
            // Inside [lower, upper]: dead zone, no change.
        }
    }

    ThrottleDecision {
        batch_size,
        delay_ms,
        transition,
    }
}

/// Feed one sample through the controller against a live job.
///
/// Records the observation in the job's stats, applies the tuned
/// `batch_size`/`delay_ms`, performs any forced transition, and wakes the
/// runner if the status changed. No-op for terminal jobs.
pub fn apply_sample(handle: &JobHandle, sample: &MetricsSample) -> Option<AutoTransition> {
    let transition = handle.with_job(|job| {
        if job.is_terminal() {
            return None;
        }

        if let Some(mspt) = sample.mspt {
            job.stats.last_mspt = Some(mspt);
        }
        if let Some(tps) = sample.tps {
            job.stats.last_tps = Some(tps);
        }

        let decision = evaluate(
            &job.policy,
            &job.stats,
            job.status,
            job.paused_by_throttle,
            sample,
        );

        if decision.batch_size != job.stats.batch_size || decision.delay_ms != job.stats.delay_ms {
            debug!(
                job = %job.id,
                batch_size = decision.batch_size,
                delay_ms = decision.delay_ms,
                mspt = ?sample.mspt,
                "throttle tuning adjusted"
            );
        }
        job.stats.batch_size = decision.batch_size;
        job.stats.delay_ms = decision.delay_ms;

        match decision.transition {
            Some(AutoTransition::Pause) => {
                job.pause(true);
                info!(job = %job.id, tps = ?sample.tps, "TPS below threshold; auto-pausing job");
            }
            Some(AutoTransition::Resume) => {
                job.resume();
                info!(job = %job.id, tps = ?sample.tps, "TPS recovered; auto-resuming job");
            }
            None => {}
        }

        decision.transition
    });

    if transition.is_some() {
        handle.notify_status_changed();
    }
    transition
}
