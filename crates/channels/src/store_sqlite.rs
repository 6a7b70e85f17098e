//! SQLite-backed channel store using sqlx.

use {
    async_trait::async_trait,
    sqlx::{
        Row, SqlitePool,
        sqlite::{SqlitePoolOptions, SqliteRow},
    },
    ticketry_common::now_ms,
};

use crate::{
    Error, Result,
    store::{ChannelStatusUpdate, ChannelStore},
    types::{Channel, ChannelNew},
};

/// SQLite-backed persistence for channels.
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

fn row_to_channel(row: &SqliteRow) -> Result<Channel> {
    let options: String = row.get("options");
    Ok(Channel {
        id: row.get("id"),
        provider: row.get("provider"),
        options: serde_json::from_str(&options)?,
        active: row.get::<i64, _>("active") != 0,
        status_in: row.get("status_in"),
        status_out: row.get("status_out"),
        last_log_in: row.get("last_log_in"),
        last_log_out: row.get("last_log_out"),
        created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
        updated_at_ms: row.get::<i64, _>("updated_at_ms") as u64,
    })
}

#[async_trait]
impl ChannelStore for SqliteStore {
    async fn create(&self, new: ChannelNew) -> Result<Channel> {
        let now = now_ms() as i64;
        let options = serde_json::to_string(&new.options)?;
        let row = sqlx::query(
            "INSERT INTO channels (provider, options, active, created_at_ms, updated_at_ms)
             VALUES (?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&new.provider)
        .bind(&options)
        .bind(new.active as i64)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        row_to_channel(&row)
    }

    async fn get(&self, id: i64) -> Result<Option<Channel>> {
        let row = sqlx::query("SELECT * FROM channels WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_channel).transpose()
    }

    async fn list(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query("SELECT * FROM channels ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_channel).collect()
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::channel_not_found(Some(id), None));
        }
        Ok(())
    }

    async fn update_status(&self, id: i64, update: ChannelStatusUpdate) -> Result<Channel> {
        // COALESCE keeps untouched fields; one UPDATE keeps the status whole.
        let row = sqlx::query(
            "UPDATE channels
             SET status_in     = COALESCE(?, status_in),
                 status_out    = COALESCE(?, status_out),
                 last_log_in   = COALESCE(?, last_log_in),
                 last_log_out  = COALESCE(?, last_log_out),
                 updated_at_ms = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(&update.status_in)
        .bind(&update.status_out)
        .bind(&update.last_log_in)
        .bind(&update.last_log_out)
        .bind(now_ms() as i64)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_to_channel(&row),
            None => Err(Error::channel_not_found(Some(id), None)),
        }
    }

    async fn find_by_account(
        &self,
        provider: &str,
        screen_name: &str,
    ) -> Result<Option<Channel>> {
        let row = sqlx::query(
            "SELECT * FROM channels
             WHERE active = 1
               AND provider = ?
               AND json_extract(options, '$.user.screenName') = ?
             ORDER BY id
             LIMIT 1",
        )
        .bind(provider)
        .bind(screen_name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_channel).transpose()
    }
}
