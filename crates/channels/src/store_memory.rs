//! In-memory store for testing.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicI64, Ordering},
    },
};

use {async_trait::async_trait, ticketry_common::now_ms};

use crate::{
    Error, Result,
    store::{ChannelStatusUpdate, ChannelStore},
    types::{Channel, ChannelNew},
};

/// In-memory store backed by `HashMap`. No persistence — for tests only.
pub struct InMemoryStore {
    channels: Mutex<HashMap<i64, Channel>>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn screen_name_of(channel: &Channel) -> Option<&str> {
    channel.options.pointer("/user/screenName")?.as_str()
}

#[async_trait]
impl ChannelStore for InMemoryStore {
    async fn create(&self, new: ChannelNew) -> Result<Channel> {
        let now = now_ms();
        let channel = Channel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            provider: new.provider,
            options: new.options,
            active: new.active,
            status_in: None,
            status_out: None,
            last_log_in: None,
            last_log_out: None,
            created_at_ms: now,
            updated_at_ms: now,
        };
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.insert(channel.id, channel.clone());
        Ok(channel)
    }

    async fn get(&self, id: i64) -> Result<Option<Channel>> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        Ok(channels.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Channel>> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = channels.values().cloned().collect();
        out.sort_by_key(|c| c.id);
        Ok(out)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if channels.remove(&id).is_none() {
            return Err(Error::channel_not_found(Some(id), None));
        }
        Ok(())
    }

    async fn update_status(&self, id: i64, update: ChannelStatusUpdate) -> Result<Channel> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let channel = channels
            .get_mut(&id)
            .ok_or_else(|| Error::channel_not_found(Some(id), None))?;
        if let Some(v) = update.status_in {
            channel.status_in = Some(v);
        }
        if let Some(v) = update.status_out {
            channel.status_out = Some(v);
        }
        if let Some(v) = update.last_log_in {
            channel.last_log_in = Some(v);
        }
        if let Some(v) = update.last_log_out {
            channel.last_log_out = Some(v);
        }
        channel.updated_at_ms = now_ms();
        Ok(channel.clone())
    }

    async fn find_by_account(
        &self,
        provider: &str,
        screen_name: &str,
    ) -> Result<Option<Channel>> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        Ok(channels
            .values()
            .filter(|c| {
                c.active && c.provider == provider && screen_name_of(c) == Some(screen_name)
            })
            .min_by_key(|c| c.id)
            .cloned())
    }
}
