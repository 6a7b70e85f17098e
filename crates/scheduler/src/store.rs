use async_trait::async_trait;

use crate::{
    Result,
    types::{Job, JobRunRecord},
};

/// Persistent storage for delivery jobs and their run history.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn load_jobs(&self) -> Result<Vec<Job>>;
    async fn save_job(&self, job: &Job) -> Result<()>;
    async fn update_job(&self, job: &Job) -> Result<()>;
    async fn delete_job(&self, id: &str) -> Result<()>;
    async fn append_run(&self, run: &JobRunRecord) -> Result<()>;
    async fn get_runs(&self, job_id: &str, limit: usize) -> Result<Vec<JobRunRecord>>;
}
