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
    store::{ArticleStore, TicketStore},
    types::{
        Article, ArticleNew, ArticleUpdate, Ticket, TicketNew, TicketPreferences, apply_update,
        validate_new,
    },
};

/// In-memory store backed by `HashMap`. No persistence — for tests only.
pub struct InMemoryStore {
    tickets: Mutex<HashMap<i64, Ticket>>,
    articles: Mutex<HashMap<i64, Article>>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tickets: Mutex::new(HashMap::new()),
            articles: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn create_ticket(&self, new: TicketNew) -> Result<Ticket> {
        let now = now_ms();
        let ticket = Ticket {
            id: self.alloc_id(),
            number: new.number,
            title: new.title,
            preferences: new.preferences,
            created_at_ms: now,
            updated_at_ms: now,
        };
        let mut tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
        tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        let tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
        Ok(tickets.get(&id).cloned())
    }

    async fn update_preferences(&self, id: i64, preferences: TicketPreferences) -> Result<Ticket> {
        let mut tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
        let ticket = tickets
            .get_mut(&id)
            .ok_or_else(|| Error::ticket_not_found(id))?;
        ticket.preferences = preferences;
        ticket.updated_at_ms = now_ms();
        Ok(ticket.clone())
    }
}

#[async_trait]
impl ArticleStore for InMemoryStore {
    async fn create(&self, new: ArticleNew) -> Result<Article> {
        validate_new(&new)?;
        {
            let tickets = self.tickets.lock().unwrap_or_else(|e| e.into_inner());
            if !tickets.contains_key(&new.ticket_id) {
                return Err(Error::ticket_not_found(new.ticket_id));
            }
        }

        let now = now_ms();
        let article = Article {
            id: self.alloc_id(),
            ticket_id: new.ticket_id,
            subject: new.subject,
            body: new.body,
            content_type: new.content_type,
            sender: new.sender,
            direction: new.direction,
            from: None,
            to: None,
            cc: new.cc,
            message_id: None,
            preferences: new.preferences,
            created_at_ms: now,
            updated_at_ms: now,
        };
        let mut articles = self.articles.lock().unwrap_or_else(|e| e.into_inner());
        articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn get(&self, id: i64) -> Result<Option<Article>> {
        let articles = self.articles.lock().unwrap_or_else(|e| e.into_inner());
        Ok(articles.get(&id).cloned())
    }

    async fn update(&self, id: i64, update: ArticleUpdate) -> Result<Article> {
        let mut articles = self.articles.lock().unwrap_or_else(|e| e.into_inner());
        let article = articles
            .get_mut(&id)
            .ok_or_else(|| Error::article_not_found(id))?;
        apply_update(article, &update, now_ms());
        Ok(article.clone())
    }

    async fn list_for_ticket(&self, ticket_id: i64) -> Result<Vec<Article>> {
        let articles = self.articles.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = articles
            .values()
            .filter(|a| a.ticket_id == ticket_id)
            .cloned()
            .collect();
        out.sort_by_key(|a| a.id);
        Ok(out)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::*};

    async fn store_with_ticket() -> (InMemoryStore, Ticket) {
        let store = InMemoryStore::new();
        let ticket = store
            .create_ticket(TicketNew {
                number: "20015".into(),
                title: "tweet inquiry".into(),
                preferences: TicketPreferences::default(),
            })
            .await
            .unwrap();
        (store, ticket)
    }

    fn make_new(ticket_id: i64) -> ArticleNew {
        ArticleNew {
            ticket_id,
            subject: Some("com test 1".into()),
            body: "some message 123".into(),
            content_type: "text/plain".into(),
            sender: SenderRole::Agent,
            direction: Direction::Outbound,
            cc: None,
            preferences: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn create_persists_nul_bytes_verbatim() {
        let (store, ticket) = store_with_ticket().await;
        let mut new = make_new(ticket.id);
        new.subject = Some("com test 1\u{0}".into());
        new.body = "some\u{0}message 123".into();

        let article = store.create(new).await.unwrap();
        let reloaded = store.get(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded.subject.as_deref(), Some("com test 1\u{0}"));
        assert_eq!(reloaded.body, "some\u{0}message 123");
    }

    #[tokio::test]
    async fn create_rejects_missing_ticket() {
        let store = InMemoryStore::new();
        let err = store.create(make_new(99)).await.unwrap_err();
        assert!(matches!(err, Error::TicketNotFound { ticket_id: 99 }));
    }

    #[tokio::test]
    async fn update_is_applied_in_one_step() {
        let (store, ticket) = store_with_ticket().await;
        let article = store.create(make_new(ticket.id)).await.unwrap();

        let updated = store
            .update(article.id, ArticleUpdate {
                from: Some("@example".into()),
                to: Some(String::new()),
                message_id: Some("1069382411899817990".into()),
                preferences_merge: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.from.as_deref(), Some("@example"));
        assert_eq!(updated.message_id.as_deref(), Some("1069382411899817990"));
        // Untouched fields survive.
        assert_eq!(updated.body, article.body);
        assert_eq!(updated.subject, article.subject);
    }

    #[tokio::test]
    async fn update_unknown_article_fails() {
        let store = InMemoryStore::new();
        let err = store.update(7, ArticleUpdate::default()).await.unwrap_err();
        assert!(matches!(err, Error::ArticleNotFound { article_id: 7 }));
    }

    #[tokio::test]
    async fn list_for_ticket_orders_by_id() {
        let (store, ticket) = store_with_ticket().await;
        store.create(make_new(ticket.id)).await.unwrap();
        store.create(make_new(ticket.id)).await.unwrap();

        let articles = store.list_for_ticket(ticket.id).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert!(articles[0].id < articles[1].id);
    }
}
