use async_trait::async_trait;

use crate::{
    Result,
    types::{Article, ArticleNew, ArticleUpdate, Ticket, TicketNew, TicketPreferences},
};

/// Persistent storage for tickets.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn create_ticket(&self, new: TicketNew) -> Result<Ticket>;
    async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>>;
    async fn update_preferences(&self, id: i64, preferences: TicketPreferences) -> Result<Ticket>;
}

/// Persistent storage for ticket articles.
///
/// `create` validates the input (a malformed article fails synchronously)
/// and checks the owning ticket exists. `update` applies the whole patch in
/// one operation; readers never observe a partially applied dispatch
/// result.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn create(&self, new: ArticleNew) -> Result<Article>;
    async fn get(&self, id: i64) -> Result<Option<Article>>;
    async fn update(&self, id: i64, update: ArticleUpdate) -> Result<Article>;
    async fn list_for_ticket(&self, ticket_id: i64) -> Result<Vec<Article>>;
}
