use async_trait::async_trait;

use crate::{
    Result,
    types::{Channel, ChannelNew},
};

/// Patch for a channel's health status fields.
///
/// `None` leaves a field untouched; all `Some` fields land in one store
/// operation, so an observer never sees a half-updated status.
#[derive(Debug, Clone, Default)]
pub struct ChannelStatusUpdate {
    pub status_in: Option<String>,
    pub status_out: Option<String>,
    pub last_log_in: Option<String>,
    pub last_log_out: Option<String>,
}

/// Persistent storage for channel configurations.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    async fn create(&self, new: ChannelNew) -> Result<Channel>;
    async fn get(&self, id: i64) -> Result<Option<Channel>>;
    async fn list(&self) -> Result<Vec<Channel>>;
    async fn delete(&self, id: i64) -> Result<()>;

    /// Apply a status patch atomically.
    async fn update_status(&self, id: i64, update: ChannelStatusUpdate) -> Result<Channel>;

    /// Find the active channel of `provider` whose account screen name
    /// matches, lowest id first. Used to resolve a replacement when the
    /// channel a ticket references is gone.
    async fn find_by_account(
        &self,
        provider: &str,
        screen_name: &str,
    ) -> Result<Option<Channel>>;
}
