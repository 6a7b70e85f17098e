//! In-memory store for testing.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    Error, Result,
    store::JobStore,
    types::{Job, JobRunRecord},
};

/// In-memory store backed by `HashMap`. No persistence — for tests only.
pub struct InMemoryStore {
    jobs: Mutex<HashMap<String, Job>>,
    runs: Mutex<Vec<JobRunRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            runs: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn load_jobs(&self) -> Result<Vec<Job>> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(jobs.values().cloned().collect())
    }

    async fn save_job(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if !jobs.contains_key(&job.id) {
            return Err(Error::job_not_found(&job.id));
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn delete_job(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if jobs.remove(id).is_none() {
            return Err(Error::job_not_found(id));
        }
        Ok(())
    }

    async fn append_run(&self, run: &JobRunRecord) -> Result<()> {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        runs.push(run.clone());
        Ok(())
    }

    async fn get_runs(&self, job_id: &str, limit: usize) -> Result<Vec<JobRunRecord>> {
        let runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        let records: Vec<_> = runs.iter().filter(|r| r.job_id == job_id).cloned().collect();
        let start = records.len().saturating_sub(limit);
        Ok(records[start..].to_vec())
    }
}
