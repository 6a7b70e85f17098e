//! Channel resolution for dispatch.
//!
//! Tickets hold a weak back-reference to their originating channel: the
//! channel id plus the last-known provider and account screen name. The
//! channel record may have been deleted and recreated by an operator in the
//! meantime, so resolution falls back to an account-identity match.

use tracing::debug;

use crate::{Error, Result, store::ChannelStore, types::Channel};

/// Resolve the channel an outgoing article should be delivered through.
///
/// Lookup order:
/// 1. by `channel_id`, when that record still exists;
/// 2. by `(provider, screen_name)`: any active channel of the same provider
///    whose configured account matches, lowest id first.
///
/// Fails with [`Error::ChannelNotFound`] when neither resolves.
pub async fn resolve_channel(
    store: &dyn ChannelStore,
    channel_id: Option<i64>,
    provider: Option<&str>,
    screen_name: Option<&str>,
) -> Result<Channel> {
    if let Some(id) = channel_id {
        if let Some(channel) = store.get(id).await? {
            return Ok(channel);
        }
        debug!(channel_id = id, "referenced channel gone, trying account match");
    }

    if let (Some(provider), Some(screen_name)) = (provider, screen_name) {
        if let Some(channel) = store.find_by_account(provider, screen_name).await? {
            debug!(
                channel_id = channel.id,
                provider, screen_name, "resolved replacement channel"
            );
            return Ok(channel);
        }
    }

    Err(Error::channel_not_found(channel_id, screen_name))
}
