// src/job/state.rs

//! The `Job` record and its state machine.
//!
//! All status transitions go through the methods here; each returns whether
//! anything changed, so a transition that is not legal from the current
//! state is a visible no-op rather than an error. Terminal statuses
//! (`completed`/`failed`/`canceled`) are final: every mutating method checks
//! terminality first, which is what keeps a finished job from ever
//! un-terminating no matter how stale the caller's view was.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::command::Command;
use crate::types::{JobStatus, RunMode};

/// Opaque unique job identifier. Generated at creation, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Throttle policy bounds for one job.
///
/// The adaptive controller may move `batch_size`/`delay_ms` only inside
/// these bounds; the TPS gate applies regardless of `adaptive_throttle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPolicy {
    pub adaptive_throttle: bool,
    pub tps_pause_threshold: f64,
    pub mspt_lower_bound: f64,
    pub mspt_upper_bound: f64,
    pub batch_size_min: usize,
    pub batch_size_max: usize,
    pub delay_ms_min: u64,
    pub delay_ms_max: u64,
}

/// Live execution statistics for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub estimated_blocks: u64,
    pub done_blocks: u64,
    pub last_mspt: Option<f64>,
    pub last_tps: Option<f64>,
    pub batch_size: usize,
    pub delay_ms: u64,
}

/// One supervised execution of a command list against a world.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub world_id: String,
    pub created_by: String,
    pub mode: RunMode,

    /// For revert jobs: the terminal job whose command list is being
    /// re-executed through `revert`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_job: Option<JobId>,

    pub status: JobStatus,
    pub policy: JobPolicy,
    pub stats: JobStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Set when the TPS availability gate paused this job, so the gate knows
    /// a recovery may auto-resume it. A manual pause never sets this.
    #[serde(skip)]
    pub paused_by_throttle: bool,

    #[serde(skip)]
    commands: Vec<Command>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Job {
    /// Create a new job in `queued` state.
    ///
    /// `batch_size_start`/`delay_ms_start` seed the stats and are clamped to
    /// the policy bounds so the clamping invariant holds from the first
    /// observation on.
    pub fn new(
        world_id: impl Into<String>,
        created_by: impl Into<String>,
        mode: RunMode,
        source_job: Option<JobId>,
        commands: Vec<Command>,
        policy: JobPolicy,
        batch_size_start: usize,
        delay_ms_start: u64,
    ) -> Self {
        let estimated_blocks = commands.iter().map(Command::blocks).sum();
        let now = OffsetDateTime::now_utc();

        let stats = JobStats {
            estimated_blocks,
            done_blocks: 0,
            last_mspt: None,
            last_tps: None,
            batch_size: batch_size_start.clamp(policy.batch_size_min, policy.batch_size_max),
            delay_ms: delay_ms_start.clamp(policy.delay_ms_min, policy.delay_ms_max),
        };

        Self {
            id: JobId::new(),
            world_id: world_id.into(),
            created_by: created_by.into(),
            mode,
            source_job,
            status: JobStatus::Queued,
            policy,
            stats,
            error: None,
            paused_by_throttle: false,
            commands,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Clone of the command list, for building a revert job.
    pub fn commands_cloned(&self) -> Vec<Command> {
        self.commands.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = OffsetDateTime::now_utc();
    }

    /// `queued -> running`, performed by the runner when it picks the job up.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.set_status(JobStatus::Running);
        true
    }

    /// `running -> paused`. `by_throttle` records whether the TPS gate (as
    /// opposed to an operator) requested the pause.
    pub fn pause(&mut self, by_throttle: bool) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.paused_by_throttle = by_throttle;
        self.set_status(JobStatus::Paused);
        true
    }

    /// `paused -> running`. Clears the gate flag: an explicit resume always
    /// hands control back to the caller.
    pub fn resume(&mut self) -> bool {
        if self.status != JobStatus::Paused {
            return false;
        }
        self.paused_by_throttle = false;
        self.set_status(JobStatus::Running);
        true
    }

    /// Any non-terminal state -> `canceled`. The runner observes this at its
    /// next cooperative check point.
    pub fn cancel(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.set_status(JobStatus::Canceled);
        true
    }

    /// End-of-run transition to `completed`. Runner only.
    pub fn complete(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.set_status(JobStatus::Completed);
        true
    }

    /// Unrecoverable-error transition to `failed`, retaining the error for
    /// later `get` calls. Runner only.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.error = Some(error.into());
        self.set_status(JobStatus::Failed);
        true
    }

    /// Record forward progress. No-op once terminal, so `done_blocks` is
    /// frozen the instant a job finishes even if a command was in flight.
    pub fn add_done_blocks(&mut self, blocks: u64) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.stats.done_blocks += blocks;
        self.updated_at = OffsetDateTime::now_utc();
        true
    }
}
