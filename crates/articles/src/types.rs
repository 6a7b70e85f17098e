//! Core data types for tickets and their articles.

use serde::{Deserialize, Serialize};

/// Message direction relative to the helpdesk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Who authored an article.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Agent,
    Customer,
    System,
}

/// Weak back-reference from a ticket to its originating channel.
///
/// Only the channel id plus the last-known account identity is stored, never
/// the channel record itself; the channel may be deleted and replaced by an
/// operator between article creation and dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_screen_name: Option<String>,
}

/// A support ticket. One ticket owns many articles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub preferences: TicketPreferences,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Input for creating a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketNew {
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub preferences: TicketPreferences,
}

/// A link attached to an article's preferences, rendered next to the message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleLink {
    pub name: String,
    pub target: String,
    pub url: String,
}

/// One message unit attached to a ticket.
///
/// `from`, `to` and `message_id` start empty for an outgoing article and are
/// filled in exactly once by the dispatch job after the provider accepts the
/// message. `preferences` is a free-form JSON object carrying provider
/// metadata and a `links` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub ticket_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    pub content_type: String,
    pub sender: SenderRole,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default = "empty_object")]
    pub preferences: serde_json::Value,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Input for creating an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleNew {
    pub ticket_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    pub content_type: String,
    pub sender: SenderRole,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(default = "empty_object")]
    pub preferences: serde_json::Value,
}

/// Patch applied to an article by the dispatch job.
///
/// Applied by a single store call: either every field lands or none does.
/// `preferences_merge` keys are shallow-merged into the existing preferences
/// object; the caller composes full values (including the `links` list)
/// before handing the patch over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences_merge: Option<serde_json::Value>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Content types an article may carry.
const CONTENT_TYPES: &[&str] = &["text/plain", "text/html"];

/// Validate creation input. NUL bytes in subject/body are valid content and
/// pass through untouched.
pub fn validate_new(new: &ArticleNew) -> crate::Result<()> {
    if new.body.is_empty() {
        return Err(crate::Error::validation("body must not be empty"));
    }
    if !CONTENT_TYPES.contains(&new.content_type.as_str()) {
        return Err(crate::Error::validation(format!(
            "unknown content type: {}",
            new.content_type
        )));
    }
    if !new.preferences.is_object() {
        return Err(crate::Error::validation("preferences must be an object"));
    }
    Ok(())
}

/// Apply an update patch to an article in place, bumping `updated_at_ms`.
pub fn apply_update(article: &mut Article, update: &ArticleUpdate, now_ms: u64) {
    if let Some(from) = &update.from {
        article.from = Some(from.clone());
    }
    if let Some(to) = &update.to {
        article.to = Some(to.clone());
    }
    if let Some(message_id) = &update.message_id {
        article.message_id = Some(message_id.clone());
    }
    if let Some(merge) = &update.preferences_merge {
        if let (Some(prefs), Some(merge)) = (article.preferences.as_object_mut(), merge.as_object())
        {
            for (k, v) in merge {
                prefs.insert(k.clone(), v.clone());
            }
        }
    }
    article.updated_at_ms = now_ms;
}
