// src/job/registry.rs

//! In-memory collection of all known jobs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::job::handle::JobHandle;
use crate::job::state::{Job, JobId};

/// Map of job id -> shared handle.
///
/// Owned by the engine and injected where needed; jobs are process-lifetime
/// only, nothing here persists. The map is read by many callers but written
/// only on insert, and a job is inserted fully constructed, so no caller
/// can observe a half-made job.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobHandle>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created job and return its shared handle.
    pub fn insert(&self, job: Job) -> Arc<JobHandle> {
        let id = job.id;
        let handle = Arc::new(JobHandle::new(job));
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        jobs.insert(id, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, id: JobId) -> Option<Arc<JobHandle>> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        jobs.get(&id).cloned()
    }

    /// Snapshot of a single job.
    pub fn snapshot(&self, id: JobId) -> Option<Job> {
        self.get(id).map(|handle| handle.snapshot())
    }

    /// Snapshots of all known jobs, oldest first.
    pub fn list(&self) -> Vec<Job> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<Job> = jobs.values().map(|handle| handle.snapshot()).collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    pub fn len(&self) -> usize {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
