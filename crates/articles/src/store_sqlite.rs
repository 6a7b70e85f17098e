//! SQLite-backed ticket/article store using sqlx.

use {
    async_trait::async_trait,
    sqlx::{
        Row, SqlitePool,
        sqlite::{SqlitePoolOptions, SqliteRow},
    },
    ticketry_common::now_ms,
    tracing::debug,
};

use crate::{
    Error, Result,
    error::Context,
    store::{ArticleStore, TicketStore},
    types::{
        Article, ArticleNew, ArticleUpdate, Direction, SenderRole, Ticket, TicketNew,
        TicketPreferences, apply_update, validate_new,
    },
};

/// SQLite-backed persistence for tickets and articles.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with its own connection pool and run migrations.
    ///
    /// For shared pools (the ticketry binary opens one database), use
    /// [`SqliteStore::with_pool`] after calling [`crate::run_migrations`].
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

fn row_to_ticket(row: &SqliteRow) -> Result<Ticket> {
    let preferences: String = row.get("preferences");
    Ok(Ticket {
        id: row.get("id"),
        number: row.get("number"),
        title: row.get("title"),
        preferences: serde_json::from_str(&preferences)?,
        created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
        updated_at_ms: row.get::<i64, _>("updated_at_ms") as u64,
    })
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let subject: Option<Vec<u8>> = row.get("subject");
    let body: Vec<u8> = row.get("body");
    let sender: String = row.get("sender");
    let direction: String = row.get("direction");
    let preferences: String = row.get("preferences");

    Ok(Article {
        id: row.get("id"),
        ticket_id: row.get("ticket_id"),
        subject: subject
            .map(|b| String::from_utf8(b).context("article subject is not valid utf-8"))
            .transpose()?,
        body: String::from_utf8(body).context("article body is not valid utf-8")?,
        content_type: row.get("content_type"),
        sender: serde_json::from_str(&sender)?,
        direction: serde_json::from_str(&direction)?,
        from: row.get("from_handle"),
        to: row.get("to_handle"),
        cc: row.get("cc"),
        message_id: row.get("message_id"),
        preferences: serde_json::from_str(&preferences)?,
        created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
        updated_at_ms: row.get::<i64, _>("updated_at_ms") as u64,
    })
}

fn encode_sender(sender: SenderRole) -> Result<String> {
    Ok(serde_json::to_string(&sender)?)
}

fn encode_direction(direction: Direction) -> Result<String> {
    Ok(serde_json::to_string(&direction)?)
}

#[async_trait]
impl TicketStore for SqliteStore {
    async fn create_ticket(&self, new: TicketNew) -> Result<Ticket> {
        let now = now_ms() as i64;
        let preferences = serde_json::to_string(&new.preferences)?;
        let row = sqlx::query(
            "INSERT INTO tickets (number, title, preferences, created_at_ms, updated_at_ms)
             VALUES (?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&new.number)
        .bind(&new.title)
        .bind(&preferences)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        row_to_ticket(&row)
    }

    async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        let row = sqlx::query("SELECT * FROM tickets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_ticket).transpose()
    }

    async fn update_preferences(&self, id: i64, preferences: TicketPreferences) -> Result<Ticket> {
        let encoded = serde_json::to_string(&preferences)?;
        let row = sqlx::query(
            "UPDATE tickets SET preferences = ?, updated_at_ms = ? WHERE id = ? RETURNING *",
        )
        .bind(&encoded)
        .bind(now_ms() as i64)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_to_ticket(&row),
            None => Err(Error::ticket_not_found(id)),
        }
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn create(&self, new: ArticleNew) -> Result<Article> {
        validate_new(&new)?;

        let ticket = sqlx::query("SELECT id FROM tickets WHERE id = ?")
            .bind(new.ticket_id)
            .fetch_optional(&self.pool)
            .await?;
        if ticket.is_none() {
            return Err(Error::ticket_not_found(new.ticket_id));
        }

        let now = now_ms() as i64;
        let preferences = serde_json::to_string(&new.preferences)?;
        let row = sqlx::query(
            "INSERT INTO ticket_articles
               (ticket_id, subject, body, content_type, sender, direction, cc,
                preferences, created_at_ms, updated_at_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(new.ticket_id)
        .bind(new.subject.as_ref().map(|s| s.as_bytes().to_vec()))
        .bind(new.body.as_bytes().to_vec())
        .bind(&new.content_type)
        .bind(encode_sender(new.sender)?)
        .bind(encode_direction(new.direction)?)
        .bind(&new.cc)
        .bind(&preferences)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        let article = row_to_article(&row)?;
        debug!(
            article_id = article.id,
            ticket_id = article.ticket_id,
            direction = ?article.direction,
            "article created"
        );
        Ok(article)
    }

    async fn get(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM ticket_articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_article).transpose()
    }

    async fn update(&self, id: i64, update: ArticleUpdate) -> Result<Article> {
        // Read-modify-write inside one transaction so the patch lands whole.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM ticket_articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut article = match row {
            Some(row) => row_to_article(&row)?,
            None => return Err(Error::article_not_found(id)),
        };

        apply_update(&mut article, &update, now_ms());

        let preferences = serde_json::to_string(&article.preferences)?;
        sqlx::query(
            "UPDATE ticket_articles
             SET from_handle = ?, to_handle = ?, message_id = ?, preferences = ?,
                 updated_at_ms = ?
             WHERE id = ?",
        )
        .bind(&article.from)
        .bind(&article.to)
        .bind(&article.message_id)
        .bind(&preferences)
        .bind(article.updated_at_ms as i64)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(article)
    }

    async fn list_for_ticket(&self, ticket_id: i64) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT * FROM ticket_articles WHERE ticket_id = ? ORDER BY id")
            .bind(ticket_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_article).collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::*};

    async fn make_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    async fn make_ticket(store: &SqliteStore) -> Ticket {
        store
            .create_ticket(TicketNew {
                number: "20015".into(),
                title: "tweet inquiry".into(),
                preferences: TicketPreferences {
                    channel_id: Some(1),
                    channel_provider: Some("twitter".into()),
                    channel_screen_name: Some("example".into()),
                },
            })
            .await
            .unwrap()
    }

    fn make_new(ticket_id: i64) -> ArticleNew {
        ArticleNew {
            ticket_id,
            subject: Some("com test 1".into()),
            body: "some message 123".into(),
            content_type: "text/plain".into(),
            sender: SenderRole::Agent,
            direction: Direction::Outbound,
            cc: None,
            preferences: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn sqlite_roundtrips_nul_bytes() {
        let store = make_store().await;
        let ticket = make_ticket(&store).await;

        let mut new = make_new(ticket.id);
        new.subject = Some("com test 1\u{0}".into());
        new.body = "some\u{0}message 123".into();

        let article = store.create(new).await.unwrap();
        let reloaded = store.get(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded.subject.as_deref(), Some("com test 1\u{0}"));
        assert_eq!(reloaded.body, "some\u{0}message 123");
    }

    #[tokio::test]
    async fn sqlite_ticket_preferences_roundtrip() {
        let store = make_store().await;
        let ticket = make_ticket(&store).await;

        let reloaded = store.get_ticket(ticket.id).await.unwrap().unwrap();
        assert_eq!(reloaded.preferences.channel_id, Some(1));
        assert_eq!(
            reloaded.preferences.channel_screen_name.as_deref(),
            Some("example")
        );
    }

    #[tokio::test]
    async fn sqlite_create_rejects_missing_ticket() {
        let store = make_store().await;
        let err = store.create(make_new(404)).await.unwrap_err();
        assert!(matches!(err, Error::TicketNotFound { ticket_id: 404 }));
    }

    #[tokio::test]
    async fn sqlite_update_preserves_untouched_fields() {
        let store = make_store().await;
        let ticket = make_ticket(&store).await;
        let article = store.create(make_new(ticket.id)).await.unwrap();

        let updated = store
            .update(article.id, ArticleUpdate {
                from: Some("@example".into()),
                to: Some(String::new()),
                message_id: Some("1069382411899817990".into()),
                preferences_merge: Some(serde_json::json!({
                    "links": [{"name": "on Twitter", "target": "_blank",
                               "url": "https://twitter.com/statuses/1069382411899817990"}]
                })),
            })
            .await
            .unwrap();

        assert_eq!(updated.from.as_deref(), Some("@example"));
        assert_eq!(updated.to.as_deref(), Some(""));
        assert_eq!(updated.preferences["links"][0]["target"], "_blank");
        assert_eq!(updated.body, article.body);
        assert_eq!(updated.subject, article.subject);
        assert_eq!(updated.cc, article.cc);
        assert_eq!(updated.content_type, article.content_type);
        assert_eq!(updated.sender, article.sender);
        assert_eq!(updated.direction, article.direction);
    }

    #[tokio::test]
    async fn sqlite_validation_error_is_synchronous() {
        let store = make_store().await;
        let ticket = make_ticket(&store).await;
        let mut new = make_new(ticket.id);
        new.content_type = "application/octet-stream".into();
        assert!(matches!(
            store.create(new).await,
            Err(Error::Validation { .. })
        ));
    }
}
