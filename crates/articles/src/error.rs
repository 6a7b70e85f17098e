use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("ticket not found: {ticket_id}")]
    TicketNotFound { ticket_id: i64 },

    #[error("article not found: {article_id}")]
    ArticleNotFound { article_id: i64 },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn ticket_not_found(ticket_id: i64) -> Self {
        Self::TicketNotFound { ticket_id }
    }

    #[must_use]
    pub fn article_not_found(article_id: i64) -> Self {
        Self::ArticleNotFound { article_id }
    }
}

impl ticketry_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

ticketry_common::impl_context!();
