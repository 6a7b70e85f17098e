//! Core scheduler: timer loop, job execution, retry handling.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use {
    tokio::{
        sync::{Mutex, Notify, RwLock, Semaphore},
        task::{JoinHandle, JoinSet},
    },
    tracing::{debug, error, info, warn},
};

use {
    crate::{
        Result,
        store::JobStore,
        types::{Job, JobPayload, JobRunRecord, JobState, RetryPolicy, RunStatus, SchedulerStatus},
    },
    ticketry_common::now_ms,
};

/// Result of executing a job's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverOutcome {
    /// The article was sent and recorded.
    Delivered,
    /// Nothing to do (already dispatched, or not an outgoing article).
    Skipped,
}

/// Parameters passed to the delivery callback.
#[derive(Debug, Clone)]
pub struct DeliverRequest {
    pub article_id: i64,
    /// 1-based attempt number for this execution.
    pub attempt: u32,
}

/// Callback that performs the actual delivery. The scheduler owns timing and
/// retries; the callback owns everything domain-specific.
pub type DeliverFn = Arc<
    dyn Fn(DeliverRequest) -> Pin<Box<dyn Future<Output = Result<DeliverOutcome>> + Send>>
        + Send
        + Sync,
>;

/// Fallback timer sleep when no job is due.
const IDLE_SLEEP_MS: u64 = 60_000;

/// The delivery scheduler.
pub struct SchedulerService {
    store: Arc<dyn JobStore>,
    jobs: RwLock<Vec<Job>>,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    wake_notify: Arc<Notify>,
    running: RwLock<bool>,
    on_deliver: DeliverFn,
    retry: RetryPolicy,
    workers: Arc<Semaphore>,
}

impl SchedulerService {
    pub fn new(store: Arc<dyn JobStore>, on_deliver: DeliverFn) -> Arc<Self> {
        Self::with_config(store, on_deliver, RetryPolicy::default(), 4)
    }

    /// Create a scheduler with an explicit retry policy and worker count.
    pub fn with_config(
        store: Arc<dyn JobStore>,
        on_deliver: DeliverFn,
        retry: RetryPolicy,
        workers: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            jobs: RwLock::new(Vec::new()),
            timer_handle: Mutex::new(None),
            wake_notify: Arc::new(Notify::new()),
            running: RwLock::new(false),
            on_deliver,
            retry,
            workers: Arc::new(Semaphore::new(workers.max(1))),
        })
    }

    /// Load persisted jobs into memory without starting the timer loop.
    pub async fn load(&self) -> Result<()> {
        let mut loaded = self.store.load_jobs().await?;
        info!(count = loaded.len(), "loaded delivery jobs");

        // A job left marked running belongs to a dead process. Clearing the
        // flag is enough: its due time is still in the past, so it runs again
        // (at-least-once).
        for job in &mut loaded {
            if job.state.running_at_ms.take().is_some() {
                warn!(id = %job.id, "resetting stale running job");
                job.updated_at_ms = now_ms();
                self.store.update_job(job).await?;
            }
        }

        let mut jobs = self.jobs.write().await;
        *jobs = loaded;
        Ok(())
    }

    /// Load jobs from store and start the timer loop.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.load().await?;

        *self.running.write().await = true;

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop().await;
        });

        *self.timer_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the timer loop.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.wake_notify.notify_one();

        let mut handle = self.timer_handle.lock().await;
        if let Some(h) = handle.take() {
            h.abort();
        }
        info!("scheduler stopped");
    }

    /// Enqueue a new job, due immediately.
    pub async fn enqueue(&self, payload: JobPayload) -> Result<Job> {
        let now = now_ms();
        let job = Job {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
            state: JobState {
                next_run_at_ms: Some(now),
                ..Default::default()
            },
            max_attempts: self.retry.max_attempts,
            created_at_ms: now,
            updated_at_ms: now,
        };

        self.store.save_job(&job).await?;

        {
            let mut jobs = self.jobs.write().await;
            jobs.push(job.clone());
        }

        self.wake_notify.notify_one();
        info!(id = %job.id, payload = ?job.payload, "delivery job enqueued");
        Ok(job)
    }

    /// Execute every due job and wait until the queue has no due work left.
    ///
    /// A failing job reschedules itself into the future, so the drain
    /// terminates. This is the synchronous suspension point callers block on.
    pub async fn run_pending(self: &Arc<Self>) -> Result<()> {
        loop {
            let due = self.take_due().await;
            if due.is_empty() {
                return Ok(());
            }
            self.execute_batch(due).await;
        }
    }

    /// List all queued jobs (including parked ones).
    pub async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.clone()
    }

    /// Get run history for a job.
    pub async fn runs(&self, job_id: &str, limit: usize) -> Result<Vec<JobRunRecord>> {
        self.store.get_runs(job_id, limit).await
    }

    /// Get scheduler status.
    pub async fn status(&self) -> SchedulerStatus {
        let jobs = self.jobs.read().await;
        let running = *self.running.read().await;
        let next_run_at_ms = jobs.iter().filter_map(|j| j.state.next_run_at_ms).min();

        SchedulerStatus {
            running,
            job_count: jobs.len(),
            next_run_at_ms,
        }
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: &Arc<Self>) {
        loop {
            if !*self.running.read().await {
                break;
            }

            let sleep_ms = self.ms_until_next_due().await;
            if sleep_ms > 0 {
                let notify = Arc::clone(&self.wake_notify);
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {},
                    () = notify.notified() => {
                        debug!("timer loop woken by notify");
                    },
                }
            }

            if !*self.running.read().await {
                break;
            }

            let due = self.take_due().await;
            if !due.is_empty() {
                self.execute_batch(due).await;
            }
        }
    }

    async fn ms_until_next_due(&self) -> u64 {
        let jobs = self.jobs.read().await;
        let next = jobs
            .iter()
            .filter(|j| j.state.running_at_ms.is_none())
            .filter_map(|j| j.state.next_run_at_ms)
            .min();
        match next {
            Some(at) => at.saturating_sub(now_ms()),
            None => IDLE_SLEEP_MS,
        }
    }

    /// Claim all due jobs, marking them running so no other path picks them up.
    /// The mark is persisted so a crash mid-run is detectable on restart.
    async fn take_due(&self) -> Vec<Job> {
        let now = now_ms();
        let mut due = Vec::new();
        {
            let mut jobs = self.jobs.write().await;
            for job in jobs.iter_mut() {
                let is_due = job.state.running_at_ms.is_none()
                    && job.state.next_run_at_ms.is_some_and(|at| at <= now);
                if is_due {
                    job.state.running_at_ms = Some(now);
                    due.push(job.clone());
                }
            }
        }
        for job in &due {
            if let Err(e) = self.store.update_job(job).await {
                error!(id = %job.id, error = %e, "failed to persist running mark");
            }
        }
        due
    }

    /// Run a batch of claimed jobs, bounded by the worker pool.
    async fn execute_batch(self: &Arc<Self>, due: Vec<Job>) {
        let mut set = JoinSet::new();
        for job in due {
            // The semaphore is never closed; acquire only fails at shutdown.
            let Ok(permit) = Arc::clone(&self.workers).acquire_owned().await else {
                continue;
            };
            let svc = Arc::clone(self);
            set.spawn(async move {
                let _permit = permit;
                svc.execute_job(job).await;
            });
        }
        while set.join_next().await.is_some() {}
    }

    async fn execute_job(self: &Arc<Self>, job: Job) {
        let attempt = job.state.attempts + 1;
        let started = now_ms();
        debug!(id = %job.id, attempt, "executing delivery job");

        let result = match &job.payload {
            JobPayload::DeliverArticle { article_id } => {
                (self.on_deliver)(DeliverRequest {
                    article_id: *article_id,
                    attempt,
                })
                .await
            },
        };

        let finished = now_ms();
        let (status, error_text) = match &result {
            Ok(DeliverOutcome::Delivered) => (RunStatus::Ok, None),
            Ok(DeliverOutcome::Skipped) => (RunStatus::Skipped, None),
            Err(e) => (RunStatus::Error, Some(e.to_string())),
        };

        let run = JobRunRecord {
            job_id: job.id.clone(),
            attempt,
            started_at_ms: started,
            finished_at_ms: finished,
            status,
            error: error_text.clone(),
            duration_ms: finished.saturating_sub(started),
        };
        if let Err(e) = self.store.append_run(&run).await {
            error!(id = %job.id, error = %e, "failed to record job run");
        }

        match status {
            RunStatus::Ok | RunStatus::Skipped => {
                if let Err(e) = self.store.delete_job(&job.id).await {
                    error!(id = %job.id, error = %e, "failed to delete finished job");
                }
                let mut jobs = self.jobs.write().await;
                jobs.retain(|j| j.id != job.id);
                info!(id = %job.id, ?status, "delivery job finished");
            },
            RunStatus::Error => {
                let mut jobs = self.jobs.write().await;
                if let Some(stored) = jobs.iter_mut().find(|j| j.id == job.id) {
                    stored.state.attempts = attempt;
                    stored.state.running_at_ms = None;
                    stored.state.last_status = Some(RunStatus::Error);
                    stored.state.last_error = error_text.clone();
                    stored.updated_at_ms = finished;

                    if attempt >= stored.max_attempts {
                        stored.state.next_run_at_ms = None;
                        warn!(
                            id = %job.id,
                            attempt,
                            max_attempts = stored.max_attempts,
                            error = error_text.as_deref().unwrap_or(""),
                            "delivery job parked after exhausting attempts"
                        );
                    } else {
                        let delay = self.retry.delay_ms(attempt);
                        stored.state.next_run_at_ms = Some(finished + delay);
                        warn!(
                            id = %job.id,
                            attempt,
                            retry_in_ms = delay,
                            error = error_text.as_deref().unwrap_or(""),
                            "delivery job failed, retrying"
                        );
                    }

                    let updated = stored.clone();
                    drop(jobs);
                    if let Err(e) = self.store.update_job(&updated).await {
                        error!(id = %updated.id, error = %e, "failed to persist job state");
                    }
                }
            },
        }
    }
}
