//! Channel integrations.
//!
//! A channel is a configured endpoint for a communication provider (e.g. a
//! social-media account), owning delivery credentials and health status.
//! Each provider implements the [`ChannelDriver`] trait; the dispatch job
//! depends only on that interface, so new providers slot in without touching
//! dispatch.

pub mod driver;
pub mod error;
pub mod health;
pub mod resolve;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use {
    driver::{ChannelDriver, DriverRegistry},
    error::{Error, Result},
    health::HealthTracker,
    resolve::resolve_channel,
    store::{ChannelStatusUpdate, ChannelStore},
    types::{Channel, ChannelNew, DeliveryReceipt, OutboundMessage, ProviderResponse},
};

/// Run database migrations for the channels crate.
///
/// Creates the `channels` table. Call at application startup when using
/// [`store_sqlite::SqliteStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
