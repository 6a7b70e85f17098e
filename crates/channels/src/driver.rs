use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    Result,
    types::{DeliveryReceipt, OutboundMessage, ProviderResponse},
};

/// Core channel driver trait. Each messaging provider implements this.
///
/// A driver translates between the generic article model and the provider's
/// wire format: `send` turns an outbound message into a provider request,
/// `parse` turns the provider's response back into article metadata.
#[async_trait]
pub trait ChannelDriver: Send + Sync {
    /// Provider identifier (e.g. "twitter"). Registry key and the value
    /// matched against `Channel::provider`.
    fn provider(&self) -> &str;

    /// Human-readable provider name, used in article links ("Twitter").
    fn display_name(&self) -> &str;

    /// Deliver the message through the provider using the channel's options.
    async fn send(
        &self,
        message: &OutboundMessage,
        options: &serde_json::Value,
    ) -> Result<ProviderResponse>;

    /// Extract handles, message id and metadata from a provider response.
    fn parse(&self, response: &ProviderResponse) -> Result<DeliveryReceipt>;

    /// Public permalink for a delivered message.
    fn permalink(&self, message_id: &str) -> String;
}

/// Provider type → driver. Selected by the channel's configured provider at
/// dispatch time; no type-based branching anywhere downstream.
#[derive(Default, Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn ChannelDriver>>,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its own provider id. Last registration wins.
    pub fn register(&mut self, driver: Arc<dyn ChannelDriver>) {
        self.drivers.insert(driver.provider().to_string(), driver);
    }

    #[must_use]
    pub fn get(&self, provider: &str) -> Option<Arc<dyn ChannelDriver>> {
        self.drivers.get(provider).cloned()
    }

    #[must_use]
    pub fn providers(&self) -> Vec<String> {
        let mut out: Vec<_> = self.drivers.keys().cloned().collect();
        out.sort();
        out
    }
}
