//! [`ChannelDriver`] implementation for Twitter.

use std::sync::Arc;

use {async_trait::async_trait, tracing::info};

use ticketry_channels::{
    ChannelDriver, DeliveryReceipt, OutboundMessage, ProviderResponse, Result,
};

use crate::{
    client::{StatusUpdate, TwitterApi},
    config::TwitterOptions,
};

/// Tweets are capped at 280 characters; longer article bodies are truncated.
pub const TWEET_MAX_CHARS: usize = 280;

pub struct TwitterDriver {
    api: Arc<dyn TwitterApi>,
}

impl TwitterDriver {
    #[must_use]
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self { api }
    }
}

/// Truncate to `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl ChannelDriver for TwitterDriver {
    fn provider(&self) -> &str {
        "twitter"
    }

    fn display_name(&self) -> &str {
        "Twitter"
    }

    async fn send(
        &self,
        message: &OutboundMessage,
        options: &serde_json::Value,
    ) -> Result<ProviderResponse> {
        let opts = TwitterOptions::from_value(options)?;
        let status = truncate_chars(&message.body, TWEET_MAX_CHARS);

        info!(
            article_id = message.article_id,
            screen_name = %opts.user.screen_name,
            status_chars = status.chars().count(),
            "sending article as tweet"
        );

        let tweet = self
            .api
            .update_status(&opts.auth.bearer_token, &StatusUpdate {
                status,
                in_reply_to_status_id: None,
            })
            .await?;

        Ok(ProviderResponse(serde_json::to_value(tweet)?))
    }

    fn parse(&self, response: &ProviderResponse) -> Result<DeliveryReceipt> {
        let tweet: crate::client::TweetResponse = serde_json::from_value(response.0.clone())?;

        let to = tweet
            .in_reply_to_screen_name
            .as_deref()
            .map(|handle| format!("@{handle}"))
            .unwrap_or_default();

        Ok(DeliveryReceipt {
            from: format!("@{}", tweet.user.screen_name),
            to,
            message_id: tweet.id_str,
            provider_metadata: serde_json::json!({ "twitter": response.0 }),
        })
    }

    fn permalink(&self, message_id: &str) -> String {
        format!("https://twitter.com/statuses/{message_id}")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::client::{TweetResponse, TweetUser},
        std::sync::Mutex,
        ticketry_channels::Error,
    };

    /// Stub API that records requests and replies with a canned tweet.
    struct StubApi {
        requests: Mutex<Vec<StatusUpdate>>,
        reply: TweetResponse,
    }

    impl StubApi {
        fn new(reply: TweetResponse) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply,
            }
        }
    }

    #[async_trait]
    impl TwitterApi for StubApi {
        async fn update_status(
            &self,
            _bearer_token: &str,
            update: &StatusUpdate,
        ) -> Result<TweetResponse> {
            self.requests
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(update.clone());
            Ok(self.reply.clone())
        }
    }

    fn canned_tweet() -> TweetResponse {
        TweetResponse {
            id_str: "1069382411899817990".into(),
            text: "some message 123".into(),
            user: TweetUser {
                id_str: "1405469528".into(),
                screen_name: "example".into(),
            },
            in_reply_to_screen_name: None,
            created_at: Some("Mon Dec 03 03:05:42 +0000 2018".into()),
        }
    }

    fn options() -> serde_json::Value {
        serde_json::json!({
            "user": {"id": "1405469528", "screenName": "example"},
            "auth": {"bearerToken": "AAAA"},
        })
    }

    fn message(body: &str) -> OutboundMessage {
        OutboundMessage {
            article_id: 1,
            ticket_id: 1,
            subject: None,
            body: body.into(),
            to: None,
        }
    }

    #[tokio::test]
    async fn send_truncates_to_tweet_limit() {
        let api = Arc::new(StubApi::new(canned_tweet()));
        let driver = TwitterDriver::new(Arc::clone(&api) as Arc<dyn TwitterApi>);

        let long_body = "x".repeat(300);
        driver.send(&message(&long_body), &options()).await.unwrap();

        let requests = api.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].status.chars().count(), TWEET_MAX_CHARS);
    }

    #[tokio::test]
    async fn send_rejects_foreign_options() {
        let driver = TwitterDriver::new(Arc::new(StubApi::new(canned_tweet())));
        let err = driver
            .send(&message("hi"), &serde_json::json!({"botToken": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }

    #[tokio::test]
    async fn parse_maps_handles_and_id() {
        let driver = TwitterDriver::new(Arc::new(StubApi::new(canned_tweet())));
        let response = driver.send(&message("hello"), &options()).await.unwrap();

        let receipt = driver.parse(&response).unwrap();
        assert_eq!(receipt.from, "@example");
        // Tweet addressed to no one: recipient is empty.
        assert_eq!(receipt.to, "");
        assert_eq!(receipt.message_id, "1069382411899817990");
        assert_eq!(
            receipt.provider_metadata["twitter"]["id_str"],
            "1069382411899817990"
        );
    }

    #[tokio::test]
    async fn parse_maps_reply_recipient() {
        let mut tweet = canned_tweet();
        tweet.in_reply_to_screen_name = Some("customer".into());
        let driver = TwitterDriver::new(Arc::new(StubApi::new(tweet)));

        let response = driver.send(&message("hello"), &options()).await.unwrap();
        let receipt = driver.parse(&response).unwrap();
        assert_eq!(receipt.to, "@customer");
    }

    #[test]
    fn permalink_uses_statuses_path() {
        let driver = TwitterDriver::new(Arc::new(StubApi::new(canned_tweet())));
        assert_eq!(
            driver.permalink("1069382411899817990"),
            "https://twitter.com/statuses/1069382411899817990"
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 280), "short");
    }
}
