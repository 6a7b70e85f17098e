//! Per-channel Twitter options, deserialized from `Channel::options`.

use serde::{Deserialize, Serialize};

use ticketry_channels::{Error, Result};

/// The account a channel posts as.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TwitterUser {
    pub id: String,
    pub screen_name: String,
}

/// API credentials for the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TwitterAuth {
    pub bearer_token: String,
}

/// Channel options for the Twitter provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TwitterOptions {
    pub user: TwitterUser,
    pub auth: TwitterAuth,
}

impl TwitterOptions {
    /// Parse a channel's options value into the Twitter shape.
    pub fn from_value(options: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(options.clone()).map_err(Error::invalid_options)
    }
}
