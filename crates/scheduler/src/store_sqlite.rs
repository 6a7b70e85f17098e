//! SQLite-backed job store using sqlx.

use {
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions},
};

use crate::{
    Error, Result,
    store::JobStore,
    types::{Job, JobRunRecord},
};

/// SQLite-backed persistence for delivery jobs and run history.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with its own connection pool and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn load_jobs(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query("SELECT data FROM delivery_jobs")
            .fetch_all(&self.pool)
            .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.get("data");
            jobs.push(serde_json::from_str(&data)?);
        }
        Ok(jobs)
    }

    async fn save_job(&self, job: &Job) -> Result<()> {
        let data = serde_json::to_string(job)?;
        sqlx::query(
            "INSERT INTO delivery_jobs (id, data) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        )
        .bind(&job.id)
        .bind(&data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        let data = serde_json::to_string(job)?;
        let result = sqlx::query("UPDATE delivery_jobs SET data = ? WHERE id = ?")
            .bind(&data)
            .bind(&job.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::job_not_found(&job.id));
        }
        Ok(())
    }

    async fn delete_job(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM delivery_jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::job_not_found(id));
        }
        Ok(())
    }

    async fn append_run(&self, run: &JobRunRecord) -> Result<()> {
        let status = serde_json::to_string(&run.status)?;
        sqlx::query(
            "INSERT INTO delivery_runs
               (job_id, attempt, started_at_ms, finished_at_ms, status, error, duration_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&run.job_id)
        .bind(run.attempt as i64)
        .bind(run.started_at_ms as i64)
        .bind(run.finished_at_ms as i64)
        .bind(&status)
        .bind(&run.error)
        .bind(run.duration_ms as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_runs(&self, job_id: &str, limit: usize) -> Result<Vec<JobRunRecord>> {
        let rows = sqlx::query(
            "SELECT job_id, attempt, started_at_ms, finished_at_ms, status, error, duration_ms
             FROM delivery_runs
             WHERE job_id = ?
             ORDER BY started_at_ms DESC
             LIMIT ?",
        )
        .bind(job_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut runs = Vec::with_capacity(rows.len());
        for row in rows {
            let status_str: String = row.get("status");
            runs.push(JobRunRecord {
                job_id: row.get("job_id"),
                attempt: row.get::<i64, _>("attempt") as u32,
                started_at_ms: row.get::<i64, _>("started_at_ms") as u64,
                finished_at_ms: row.get::<i64, _>("finished_at_ms") as u64,
                status: serde_json::from_str(&status_str)?,
                error: row.get("error"),
                duration_ms: row.get::<i64, _>("duration_ms") as u64,
            });
        }
        // Reverse so oldest first (consistent with the memory store).
        runs.reverse();
        Ok(runs)
    }
}
