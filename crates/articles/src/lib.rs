//! Ticket and article model.
//!
//! An article is one message unit (inbound or outbound) attached to a ticket.
//! Stores come in two backends: in-memory for tests and SQLite for
//! production. Text fields tolerate embedded NUL bytes; they round-trip
//! byte-identical through either backend.

pub mod error;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use {
    error::{Error, Result},
    store::{ArticleStore, TicketStore},
    types::{
        Article, ArticleLink, ArticleNew, ArticleUpdate, Direction, SenderRole, Ticket, TicketNew,
        TicketPreferences,
    },
};

/// Run database migrations for the articles crate.
///
/// Creates the `tickets` and `ticket_articles` tables. Call at application
/// startup when using [`store_sqlite::SqliteStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
