//! Thin Twitter API client.
//!
//! The driver talks to the API through the [`TwitterApi`] trait so tests can
//! substitute a stub; [`HttpTwitterApi`] is the real thing.

use std::time::Duration;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use ticketry_channels::{Error, Result};

/// Outgoing status update request.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_status_id: Option<String>,
}

/// The posting account, as echoed back by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetUser {
    pub id_str: String,
    pub screen_name: String,
}

/// A created tweet, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetResponse {
    pub id_str: String,
    pub text: String,
    pub user: TweetUser,
    #[serde(default)]
    pub in_reply_to_screen_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Capability interface over the Twitter REST API.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    async fn update_status(
        &self,
        bearer_token: &str,
        update: &StatusUpdate,
    ) -> Result<TweetResponse>;
}

/// HTTP implementation over reqwest with a bounded request timeout:
/// a hung provider surfaces as a delivery failure, never as a stuck job.
pub struct HttpTwitterApi {
    client: reqwest::Client,
    api_base: String,
}

impl HttpTwitterApi {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::delivery("twitter", e))?;
        Ok(Self {
            client,
            api_base: api_base.into(),
        })
    }
}

#[async_trait]
impl TwitterApi for HttpTwitterApi {
    async fn update_status(
        &self,
        bearer_token: &str,
        update: &StatusUpdate,
    ) -> Result<TweetResponse> {
        let url = format!("{}/statuses/update.json", self.api_base);
        debug!(url = %url, status_len = update.status.len(), "posting status update");

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer_token)
            .json(update)
            .send()
            .await
            .map_err(|e| Error::delivery("twitter", e))?;

        let http_status = response.status();
        if !http_status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::delivery(
                "twitter",
                format!("status update rejected ({http_status}): {body}"),
            ));
        }

        response
            .json::<TweetResponse>()
            .await
            .map_err(|e| Error::delivery("twitter", format!("malformed response: {e}")))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn tweet_body() -> String {
        serde_json::json!({
            "id_str": "1069382411899817990",
            "text": "some message 123",
            "user": {"id_str": "1405469528", "screen_name": "example"},
            "in_reply_to_screen_name": null,
            "created_at": "Mon Dec 03 03:05:42 +0000 2018",
        })
        .to_string()
    }

    #[tokio::test]
    async fn posts_with_bearer_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/statuses/update.json")
            .match_header("authorization", "Bearer AAAA")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tweet_body())
            .create_async()
            .await;

        let api = HttpTwitterApi::new(server.url(), Duration::from_secs(5)).unwrap();
        let tweet = api
            .update_status("AAAA", &StatusUpdate {
                status: "some message 123".into(),
                in_reply_to_status_id: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tweet.id_str, "1069382411899817990");
        assert_eq!(tweet.user.screen_name, "example");
    }

    #[tokio::test]
    async fn rejection_surfaces_as_delivery_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/statuses/update.json")
            .with_status(403)
            .with_body(r#"{"errors":[{"code":187,"message":"Status is a duplicate."}]}"#)
            .create_async()
            .await;

        let api = HttpTwitterApi::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = api
            .update_status("AAAA", &StatusUpdate {
                status: "dup".into(),
                in_reply_to_status_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Delivery { .. }));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn malformed_body_surfaces_as_delivery_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/statuses/update.json")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let api = HttpTwitterApi::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = api
            .update_status("AAAA", &StatusUpdate {
                status: "hi".into(),
                in_reply_to_status_id: None,
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("malformed response"));
    }
}
