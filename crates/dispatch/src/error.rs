use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Articles(#[from] ticketry_articles::Error),

    #[error(transparent)]
    Channels(#[from] ticketry_channels::Error),

    #[error(transparent)]
    Scheduler(#[from] ticketry_scheduler::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
