// src/job/handle.rs

//! Shared handle through which a job is mutated.
//!
//! A job has exactly two writers: the runner driving it, and external
//! control calls (pause/resume/cancel) targeting it by id. Both go through
//! `JobHandle`, which pairs the job behind a mutex with a `Notify` so a
//! status change can wake a runner blocked in its pause-wait loop. The lock
//! is never held across an await point.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::job::state::{Job, JobId};
use crate::types::JobStatus;

#[derive(Debug)]
pub struct JobHandle {
    job: Mutex<Job>,
    status_changed: Notify,
}

impl JobHandle {
    pub fn new(job: Job) -> Self {
        Self {
            job: Mutex::new(job),
            status_changed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Job> {
        // A poisoned lock only means another writer panicked mid-update;
        // job state stays usable, so recover rather than propagate.
        self.job.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with exclusive access to the job. Keep the closure short; it
    /// runs under the handle's mutex.
    pub fn with_job<T>(&self, f: impl FnOnce(&mut Job) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn id(&self) -> JobId {
        self.lock().id
    }

    pub fn status(&self) -> JobStatus {
        self.lock().status
    }

    pub fn is_canceled(&self) -> bool {
        self.status() == JobStatus::Canceled
    }

    pub fn is_terminal(&self) -> bool {
        self.lock().is_terminal()
    }

    /// Point-in-time copy of the job, for `get`/`list` responses.
    pub fn snapshot(&self) -> Job {
        self.lock().clone()
    }

    /// Current `(batch_size, delay_ms)`. Read fresh each batch since the
    /// throttle controller may have just changed them.
    pub fn batch_parameters(&self) -> (usize, u64) {
        let job = self.lock();
        (job.stats.batch_size, job.stats.delay_ms)
    }

    pub fn start(&self) -> bool {
        self.transition(|job| job.start())
    }

    pub fn pause(&self) -> bool {
        self.transition(|job| job.pause(false))
    }

    pub fn resume(&self) -> bool {
        self.transition(|job| job.resume())
    }

    pub fn cancel(&self) -> bool {
        self.transition(|job| job.cancel())
    }

    pub fn complete(&self) -> bool {
        self.transition(|job| job.complete())
    }

    pub fn fail(&self, error: impl Into<String>) -> bool {
        self.transition(|job| job.fail(error))
    }

    pub fn add_done_blocks(&self, blocks: u64) -> bool {
        self.with_job(|job| job.add_done_blocks(blocks))
    }

    /// Apply a transition and wake any waiter when it took effect.
    fn transition(&self, f: impl FnOnce(&mut Job) -> bool) -> bool {
        let changed = self.with_job(f);
        if changed {
            self.status_changed.notify_waiters();
        }
        changed
    }

    /// Wake any runner blocked on this job's status. Used by the throttle
    /// path after an auto pause/resume.
    pub fn notify_status_changed(&self) {
        self.status_changed.notify_waiters();
    }

    /// Wait for the next status-change notification.
    ///
    /// Callers must pair this with a bounded sleep (`tokio::select!`): a
    /// transition can slip between reading the status and awaiting this, so
    /// the notification alone is a latency optimisation, not a correctness
    /// guarantee.
    pub async fn status_changed(&self) {
        self.status_changed.notified().await;
    }
}
