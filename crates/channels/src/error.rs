use thiserror::Error;

/// Typed channel errors shared across channel traits.
#[derive(Debug, Error)]
pub enum Error {
    /// No matching channel, original or replacement.
    #[error("channel not found: id={channel_id:?} screen_name={screen_name:?}")]
    ChannelNotFound {
        channel_id: Option<i64>,
        screen_name: Option<String>,
    },

    /// The provider rejected or failed the send.
    #[error("delivery failed via {provider}: {message}")]
    Delivery { provider: String, message: String },

    /// No driver registered for the channel's provider type.
    #[error("unknown provider: {provider}")]
    UnknownProvider { provider: String },

    /// Channel options do not fit the driver's expected shape.
    #[error("invalid channel options: {message}")]
    InvalidOptions { message: String },

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
    pub fn channel_not_found(channel_id: Option<i64>, screen_name: Option<&str>) -> Self {
        Self::ChannelNotFound {
            channel_id,
            screen_name: screen_name.map(Into::into),
        }
    }

    #[must_use]
    pub fn delivery(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Delivery {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unknown_provider(provider: impl Into<String>) -> Self {
        Self::UnknownProvider {
            provider: provider.into(),
        }
    }

    #[must_use]
    pub fn invalid_options(message: impl std::fmt::Display) -> Self {
        Self::InvalidOptions {
            message: message.to_string(),
        }
    }
}

impl ticketry_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

ticketry_common::impl_context!();
