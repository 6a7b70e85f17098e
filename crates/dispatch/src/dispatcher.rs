//! The dispatch job itself.

use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    ticketry_articles::{
        Article, ArticleLink, ArticleStore, ArticleUpdate, Direction, Ticket, TicketStore,
    },
    ticketry_channels::{
        DriverRegistry, HealthTracker, OutboundMessage, resolve_channel, store::ChannelStore,
    },
    ticketry_scheduler::{DeliverFn, DeliverOutcome, DeliverRequest, JobPayload, SchedulerService},
};

use crate::Result;

/// Delivers outgoing articles through their ticket's channel.
pub struct Dispatcher {
    articles: Arc<dyn ArticleStore>,
    tickets: Arc<dyn TicketStore>,
    channels: Arc<dyn ChannelStore>,
    registry: DriverRegistry,
    health: HealthTracker,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        tickets: Arc<dyn TicketStore>,
        channels: Arc<dyn ChannelStore>,
        registry: DriverRegistry,
    ) -> Self {
        let health = HealthTracker::new(Arc::clone(&channels));
        Self {
            articles,
            tickets,
            channels,
            registry,
            health,
        }
    }

    /// Deliver one article. Called by the scheduler, possibly more than once
    /// (at-least-once semantics); an already-dispatched article is skipped
    /// without touching the driver.
    ///
    /// On provider failure the article is left byte-identical, the channel's
    /// outbound status records the error, and the error propagates so the
    /// scheduler retries.
    pub async fn deliver(&self, article_id: i64) -> Result<DeliverOutcome> {
        let article = self
            .articles
            .get(article_id)
            .await?
            .ok_or_else(|| ticketry_articles::Error::article_not_found(article_id))?;

        if article.direction != Direction::Outbound {
            debug!(article_id, "not an outgoing article, skipping");
            return Ok(DeliverOutcome::Skipped);
        }
        if article.message_id.is_some() {
            debug!(article_id, "article already dispatched, skipping");
            return Ok(DeliverOutcome::Skipped);
        }

        let ticket = self
            .tickets
            .get_ticket(article.ticket_id)
            .await?
            .ok_or_else(|| ticketry_articles::Error::ticket_not_found(article.ticket_id))?;
        let prefs = &ticket.preferences;

        let channel = resolve_channel(
            self.channels.as_ref(),
            prefs.channel_id,
            prefs.channel_provider.as_deref(),
            prefs.channel_screen_name.as_deref(),
        )
        .await?;

        let Some(driver) = self.registry.get(&channel.provider) else {
            let err = ticketry_channels::Error::unknown_provider(&channel.provider);
            self.health
                .outbound_error(channel.id, &err.to_string())
                .await?;
            return Err(err.into());
        };

        let message = OutboundMessage {
            article_id: article.id,
            ticket_id: article.ticket_id,
            subject: article.subject.clone(),
            body: article.body.clone(),
            to: article.to.clone(),
        };

        let receipt = match driver.send(&message, &channel.options).await {
            Ok(response) => match driver.parse(&response) {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!(article_id, channel_id = channel.id, error = %e, "response parse failed");
                    self.health.outbound_error(channel.id, &e.to_string()).await?;
                    return Err(e.into());
                },
            },
            Err(e) => {
                warn!(article_id, channel_id = channel.id, error = %e, "delivery failed");
                self.health.outbound_error(channel.id, &e.to_string()).await?;
                return Err(e.into());
            },
        };

        // Compose the preferences merge: provider metadata plus a permalink
        // entry appended to the article's links.
        let mut merge = match receipt.provider_metadata.as_object() {
            Some(map) => map.clone(),
            None => serde_json::Map::new(),
        };
        let mut links = article
            .preferences
            .get("links")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        links.push(serde_json::to_value(ArticleLink {
            name: format!("on {}", driver.display_name()),
            target: "_blank".into(),
            url: driver.permalink(&receipt.message_id),
        })?);
        merge.insert("links".into(), serde_json::Value::Array(links));

        // One store call: the article is either fully updated or untouched.
        self.articles
            .update(article.id, ArticleUpdate {
                from: Some(receipt.from),
                to: Some(receipt.to),
                message_id: Some(receipt.message_id.clone()),
                preferences_merge: Some(serde_json::Value::Object(merge)),
            })
            .await?;

        self.health.outbound_ok(channel.id).await?;

        info!(
            article_id,
            channel_id = channel.id,
            message_id = %receipt.message_id,
            "article delivered"
        );
        Ok(DeliverOutcome::Delivered)
    }
}

/// Adapt a [`Dispatcher`] into the scheduler's delivery callback.
#[must_use]
pub fn deliver_fn(dispatcher: Arc<Dispatcher>) -> DeliverFn {
    Arc::new(move |req: DeliverRequest| {
        let dispatcher = Arc::clone(&dispatcher);
        Box::pin(async move {
            dispatcher
                .deliver(req.article_id)
                .await
                .map_err(|e| ticketry_scheduler::Error::message(e.to_string()))
        })
    })
}

/// Article-creation hook: queue a delivery job for an outgoing article on a
/// channel-linked ticket. The trigger is synchronous; the send itself waits
/// for the next scheduler cycle.
pub async fn enqueue_on_create(
    scheduler: &Arc<SchedulerService>,
    article: &Article,
    ticket: &Ticket,
) -> Result<bool> {
    let channel_linked = ticket.preferences.channel_id.is_some()
        || ticket.preferences.channel_screen_name.is_some();
    if article.direction != Direction::Outbound || !channel_linked {
        return Ok(false);
    }

    scheduler
        .enqueue(JobPayload::DeliverArticle {
            article_id: article.id,
        })
        .await?;
    Ok(true)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        std::sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        ticketry_articles::{ArticleNew, SenderRole, TicketNew, TicketPreferences, store_memory},
        ticketry_channels::{
            ChannelDriver, ChannelNew, DeliveryReceipt, ProviderResponse,
            store_memory::InMemoryStore as ChannelMemoryStore,
        },
        ticketry_scheduler::store_memory::InMemoryStore as JobMemoryStore,
    };

    const TWEET_ID: &str = "1069382411899817990";

    /// Driver stub that replies with a canned tweet and counts sends.
    struct StubDriver {
        sends: AtomicUsize,
        fail: AtomicBool,
    }

    impl StubDriver {
        fn new() -> Self {
            Self {
                sends: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ChannelDriver for StubDriver {
        fn provider(&self) -> &str {
            "twitter"
        }

        fn display_name(&self) -> &str {
            "Twitter"
        }

        async fn send(
            &self,
            _message: &OutboundMessage,
            _options: &serde_json::Value,
        ) -> ticketry_channels::Result<ProviderResponse> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ticketry_channels::Error::delivery(
                    "twitter",
                    "status update rejected (403 Forbidden)",
                ));
            }
            Ok(ProviderResponse(serde_json::json!({
                "id_str": TWEET_ID,
                "text": "some message 123",
                "user": {"id_str": "1405469528", "screen_name": "example"},
                "in_reply_to_screen_name": null,
            })))
        }

        fn parse(
            &self,
            response: &ProviderResponse,
        ) -> ticketry_channels::Result<DeliveryReceipt> {
            Ok(DeliveryReceipt {
                from: "@example".into(),
                to: String::new(),
                message_id: TWEET_ID.into(),
                provider_metadata: serde_json::json!({ "twitter": response.0 }),
            })
        }

        fn permalink(&self, message_id: &str) -> String {
            format!("https://twitter.com/statuses/{message_id}")
        }
    }

    struct Fixture {
        store: Arc<store_memory::InMemoryStore>,
        channels: Arc<ChannelMemoryStore>,
        driver: Arc<StubDriver>,
        dispatcher: Dispatcher,
    }

    fn twitter_channel(screen_name: &str) -> ChannelNew {
        ChannelNew {
            provider: "twitter".into(),
            options: serde_json::json!({
                "user": {"id": "1405469528", "screenName": screen_name},
                "auth": {"bearerToken": "AAAA"},
            }),
            active: true,
        }
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(store_memory::InMemoryStore::new());
        let channels = Arc::new(ChannelMemoryStore::new());
        let driver = Arc::new(StubDriver::new());
        let mut registry = DriverRegistry::new();
        registry.register(Arc::clone(&driver) as Arc<dyn ChannelDriver>);

        let dispatcher = Dispatcher::new(
            Arc::clone(&store) as Arc<dyn ArticleStore>,
            Arc::clone(&store) as Arc<dyn TicketStore>,
            Arc::clone(&channels) as Arc<dyn ChannelStore>,
            registry,
        );
        Fixture {
            store,
            channels,
            driver,
            dispatcher,
        }
    }

    async fn outgoing_article(fx: &Fixture, channel_id: i64) -> Article {
        let ticket = fx
            .store
            .create_ticket(TicketNew {
                number: "20015".into(),
                title: "tweet inquiry".into(),
                preferences: TicketPreferences {
                    channel_id: Some(channel_id),
                    channel_provider: Some("twitter".into()),
                    channel_screen_name: Some("example".into()),
                },
            })
            .await
            .unwrap();

        fx.store
            .create(ArticleNew {
                ticket_id: ticket.id,
                subject: Some("com test 1".into()),
                body: "some message 123".into(),
                content_type: "text/plain".into(),
                sender: SenderRole::Agent,
                direction: Direction::Outbound,
                cc: None,
                preferences: serde_json::json!({}),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn successful_dispatch_updates_article() {
        let fx = fixture().await;
        let channel = fx.channels.create(twitter_channel("example")).await.unwrap();
        let article = outgoing_article(&fx, channel.id).await;

        let outcome = fx.dispatcher.deliver(article.id).await.unwrap();
        assert_eq!(outcome, DeliverOutcome::Delivered);

        let reloaded = fx.store.get(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded.from.as_deref(), Some("@example"));
        // Tweet addressed to no one: recipient handle is empty.
        assert_eq!(reloaded.to.as_deref(), Some(""));
        assert_eq!(reloaded.message_id.as_deref(), Some(TWEET_ID));

        // Provider metadata and the permalink link are merged in.
        assert_eq!(reloaded.preferences["twitter"]["id_str"], TWEET_ID);
        assert_eq!(
            reloaded.preferences["links"][0],
            serde_json::json!({
                "name": "on Twitter",
                "target": "_blank",
                "url": format!("https://twitter.com/statuses/{TWEET_ID}"),
            })
        );

        // Content fields stay byte-identical.
        assert_eq!(reloaded.cc, article.cc);
        assert_eq!(reloaded.subject, article.subject);
        assert_eq!(reloaded.content_type, article.content_type);
        assert_eq!(reloaded.body, article.body);
        assert_eq!(reloaded.sender, article.sender);
        assert_eq!(reloaded.direction, article.direction);
    }

    #[tokio::test]
    async fn successful_dispatch_updates_channel_status() {
        let fx = fixture().await;
        let channel = fx.channels.create(twitter_channel("example")).await.unwrap();
        let article = outgoing_article(&fx, channel.id).await;

        fx.dispatcher.deliver(article.id).await.unwrap();

        let reloaded = fx.channels.get(channel.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status_out.as_deref(), Some("ok"));
        assert_eq!(reloaded.last_log_out.as_deref(), Some(""));
        assert_eq!(reloaded.status_in, None);
        assert_eq!(reloaded.last_log_in, None);
    }

    #[tokio::test]
    async fn dispatch_targets_replacement_channel() {
        let fx = fixture().await;
        let original = fx.channels.create(twitter_channel("example")).await.unwrap();
        let article = outgoing_article(&fx, original.id).await;

        // Operator deletes the channel and recreates one for the same account.
        fx.channels.delete(original.id).await.unwrap();
        let replacement = fx.channels.create(twitter_channel("example")).await.unwrap();

        fx.dispatcher.deliver(article.id).await.unwrap();

        let reloaded = fx.channels.get(replacement.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status_out.as_deref(), Some("ok"));
        assert_eq!(reloaded.last_log_out.as_deref(), Some(""));
        assert_eq!(reloaded.status_in, None);
        assert_eq!(reloaded.last_log_in, None);
    }

    #[tokio::test]
    async fn failed_send_leaves_article_untouched() {
        let fx = fixture().await;
        let channel = fx.channels.create(twitter_channel("example")).await.unwrap();
        let article = outgoing_article(&fx, channel.id).await;
        fx.driver.fail.store(true, Ordering::SeqCst);

        let err = fx.dispatcher.deliver(article.id).await.unwrap_err();
        assert!(err.to_string().contains("403"));

        let reloaded = fx.store.get(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded, article);

        let channel = fx.channels.get(channel.id).await.unwrap().unwrap();
        assert_eq!(channel.status_out.as_deref(), Some("error"));
        assert!(
            channel
                .last_log_out
                .as_deref()
                .unwrap()
                .contains("403 Forbidden")
        );
        assert_eq!(channel.status_in, None);
    }

    #[tokio::test]
    async fn second_deliver_is_skipped_without_driver_call() {
        let fx = fixture().await;
        let channel = fx.channels.create(twitter_channel("example")).await.unwrap();
        let article = outgoing_article(&fx, channel.id).await;

        fx.dispatcher.deliver(article.id).await.unwrap();
        let after_first = fx.store.get(article.id).await.unwrap().unwrap();

        let outcome = fx.dispatcher.deliver(article.id).await.unwrap();
        assert_eq!(outcome, DeliverOutcome::Skipped);
        assert_eq!(fx.driver.sends.load(Ordering::SeqCst), 1);

        let after_second = fx.store.get(article.id).await.unwrap().unwrap();
        assert_eq!(after_second, after_first);
    }

    #[tokio::test]
    async fn inbound_article_is_skipped() {
        let fx = fixture().await;
        let channel = fx.channels.create(twitter_channel("example")).await.unwrap();
        let ticket = fx
            .store
            .create_ticket(TicketNew {
                number: "20016".into(),
                title: "incoming".into(),
                preferences: TicketPreferences {
                    channel_id: Some(channel.id),
                    channel_provider: Some("twitter".into()),
                    channel_screen_name: Some("example".into()),
                },
            })
            .await
            .unwrap();
        let article = fx
            .store
            .create(ArticleNew {
                ticket_id: ticket.id,
                subject: None,
                body: "@example help".into(),
                content_type: "text/plain".into(),
                sender: SenderRole::Customer,
                direction: Direction::Inbound,
                cc: None,
                preferences: serde_json::json!({}),
            })
            .await
            .unwrap();

        let outcome = fx.dispatcher.deliver(article.id).await.unwrap();
        assert_eq!(outcome, DeliverOutcome::Skipped);
        assert_eq!(fx.driver.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unresolvable_channel_fails_and_spares_article() {
        let fx = fixture().await;
        // Ticket references a channel that never existed; no replacement.
        let article = outgoing_article(&fx, 99).await;

        let err = fx.dispatcher.deliver(article.id).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Channels(ticketry_channels::Error::ChannelNotFound { .. })
        ));

        let reloaded = fx.store.get(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded, article);
    }

    #[tokio::test]
    async fn creation_hook_enqueues_and_worker_drain_delivers() {
        let fx = fixture().await;
        let channel = fx.channels.create(twitter_channel("example")).await.unwrap();
        let article = outgoing_article(&fx, channel.id).await;
        let ticket = fx.store.get_ticket(article.ticket_id).await.unwrap().unwrap();

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&fx.store) as Arc<dyn ArticleStore>,
            Arc::clone(&fx.store) as Arc<dyn TicketStore>,
            Arc::clone(&fx.channels) as Arc<dyn ChannelStore>,
            {
                let mut registry = DriverRegistry::new();
                registry.register(Arc::clone(&fx.driver) as Arc<dyn ChannelDriver>);
                registry
            },
        ));
        let scheduler = SchedulerService::new(
            Arc::new(JobMemoryStore::new()),
            deliver_fn(Arc::clone(&dispatcher)),
        );

        let enqueued = enqueue_on_create(&scheduler, &article, &ticket).await.unwrap();
        assert!(enqueued);

        // The article is untouched until the worker pool drains.
        let before = fx.store.get(article.id).await.unwrap().unwrap();
        assert_eq!(before.message_id, None);

        scheduler.run_pending().await.unwrap();

        let after = fx.store.get(article.id).await.unwrap().unwrap();
        assert_eq!(after.message_id.as_deref(), Some(TWEET_ID));
        assert_eq!(after.from.as_deref(), Some("@example"));
        assert!(scheduler.list().await.is_empty());
    }

    #[tokio::test]
    async fn creation_hook_ignores_channel_less_tickets() {
        let fx = fixture().await;
        let ticket = fx
            .store
            .create_ticket(TicketNew {
                number: "20017".into(),
                title: "email ticket".into(),
                preferences: TicketPreferences::default(),
            })
            .await
            .unwrap();
        let article = fx
            .store
            .create(ArticleNew {
                ticket_id: ticket.id,
                subject: Some("re: your request".into()),
                body: "see attachment".into(),
                content_type: "text/plain".into(),
                sender: SenderRole::Agent,
                direction: Direction::Outbound,
                cc: None,
                preferences: serde_json::json!({}),
            })
            .await
            .unwrap();

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&fx.store) as Arc<dyn ArticleStore>,
            Arc::clone(&fx.store) as Arc<dyn TicketStore>,
            Arc::clone(&fx.channels) as Arc<dyn ChannelStore>,
            DriverRegistry::new(),
        ));
        let scheduler = SchedulerService::new(
            Arc::new(JobMemoryStore::new()),
            deliver_fn(dispatcher),
        );

        let enqueued = enqueue_on_create(&scheduler, &article, &ticket).await.unwrap();
        assert!(!enqueued);
        assert!(scheduler.list().await.is_empty());
    }
}
