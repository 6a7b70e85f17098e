//! Core data types for the delivery job system.

use serde::{Deserialize, Serialize};

/// What a job does when it runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum JobPayload {
    /// Deliver an outgoing article through its ticket's channel.
    DeliverArticle { article_id: i64 },
}

/// Outcome of a single job run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Ok,
    Error,
    Skipped,
}

/// Mutable runtime state of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    /// Completed execution attempts.
    #[serde(default)]
    pub attempts: u32,
    /// When the job is next due. `None` for a parked (exhausted) job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// A queued delivery job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub payload: JobPayload,
    #[serde(default)]
    pub state: JobState,
    pub max_attempts: u32,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Record of a completed run, stored in run history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobRunRecord {
    pub job_id: String,
    pub attempt: u32,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Retry policy for failing jobs: exponential backoff, bounded attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, doubling per completed attempt.
    #[must_use]
    pub fn delay_ms(&self, completed_attempts: u32) -> u64 {
        let shift = completed_attempts.saturating_sub(1).min(16);
        self.backoff_base_ms.saturating_mul(1 << shift)
    }
}

/// Summary status of the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub job_count: usize,
    pub next_run_at_ms: Option<u64>,
}
