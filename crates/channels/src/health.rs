//! Per-channel health status recording.
//!
//! Every dispatch attempt lands here: success clears the outbound log and
//! marks the direction "ok", failure stores the log with status "error".
//! Recording is idempotent; repeated successes yield the same observable
//! state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    Result,
    store::{ChannelStatusUpdate, ChannelStore},
    types::Channel,
};

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";

/// Records delivery outcomes on channel status fields.
#[derive(Clone)]
pub struct HealthTracker {
    store: Arc<dyn ChannelStore>,
}

impl HealthTracker {
    #[must_use]
    pub fn new(store: Arc<dyn ChannelStore>) -> Self {
        Self { store }
    }

    /// Mark the outbound direction healthy: `status_out = "ok"`, empty log.
    /// Inbound fields are left untouched.
    pub async fn outbound_ok(&self, channel_id: i64) -> Result<Channel> {
        info!(channel_id, "channel outbound ok");
        self.store
            .update_status(channel_id, ChannelStatusUpdate {
                status_out: Some(STATUS_OK.into()),
                last_log_out: Some(String::new()),
                ..Default::default()
            })
            .await
    }

    /// Mark the outbound direction failed with a descriptive log.
    pub async fn outbound_error(&self, channel_id: i64, log: &str) -> Result<Channel> {
        warn!(channel_id, log, "channel outbound error");
        self.store
            .update_status(channel_id, ChannelStatusUpdate {
                status_out: Some(STATUS_ERROR.into()),
                last_log_out: Some(log.to_string()),
                ..Default::default()
            })
            .await
    }

    /// Mark the inbound direction healthy.
    pub async fn inbound_ok(&self, channel_id: i64) -> Result<Channel> {
        info!(channel_id, "channel inbound ok");
        self.store
            .update_status(channel_id, ChannelStatusUpdate {
                status_in: Some(STATUS_OK.into()),
                last_log_in: Some(String::new()),
                ..Default::default()
            })
            .await
    }

    /// Mark the inbound direction failed with a descriptive log.
    pub async fn inbound_error(&self, channel_id: i64, log: &str) -> Result<Channel> {
        warn!(channel_id, log, "channel inbound error");
        self.store
            .update_status(channel_id, ChannelStatusUpdate {
                status_in: Some(STATUS_ERROR.into()),
                last_log_in: Some(log.to_string()),
                ..Default::default()
            })
            .await
    }
}
