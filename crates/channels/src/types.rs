//! Core data types for channels and delivery.

use serde::{Deserialize, Serialize};

/// A configured provider integration.
///
/// `options` is provider-owned JSON (account identity, credentials). The
/// four status fields are empty until the first send or fetch touches them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    pub provider: String,
    pub options: serde_json::Value,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_in: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_log_in: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_log_out: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Input for creating a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelNew {
    pub provider: String,
    pub options: serde_json::Value,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Generic projection of an outgoing article, handed to a driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub article_id: i64,
    pub ticket_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Raw provider response. Each provider owns its shape; the dispatch job
/// never looks inside, it only passes the value back to the driver's parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse(pub serde_json::Value);

/// What a driver extracted from a provider response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    /// Sender handle as the provider reports it (e.g. `@example`).
    pub from: String,
    /// Recipient handle, empty when the message addresses no one.
    pub to: String,
    /// Provider-assigned message identifier.
    pub message_id: String,
    /// Provider metadata to merge into the article's preferences.
    pub provider_metadata: serde_json::Value,
}
