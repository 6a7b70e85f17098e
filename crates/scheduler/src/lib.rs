//! Background delivery job scheduler.
//!
//! Articles created for dispatch enqueue a job here; a worker loop executes
//! due jobs through a callback with at-least-once semantics and an
//! exponential retry policy. `run_pending` drains the queue synchronously,
//! which is the suspension point tests and operational tooling block on.

pub mod error;
pub mod service;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use {
    error::{Error, Result},
    service::{DeliverFn, DeliverOutcome, DeliverRequest, SchedulerService},
    store::JobStore,
    types::{Job, JobPayload, JobRunRecord, JobState, RetryPolicy, RunStatus, SchedulerStatus},
};

/// Run database migrations for the scheduler crate.
///
/// Creates the `delivery_jobs` and `delivery_runs` tables. Call at
/// application startup when using [`store_sqlite::SqliteStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
