// region:    --- Imports
use crate::admin::{AdminLoginRequest, AdminStats, Analytics, UserStatus};
use crate::bidding::model::{Bid, Item, NewBid, NewListing};
use crate::conversation::model::{Conversation, Message, NewConversation, NewMessage};
use crate::error::Result;
use crate::session::{LoginRequest, RegisterRequest, RegisteredAccount, SessionState};
use crate::user::User;
use async_trait::async_trait;
use std::sync::Arc;

mod envelope;
mod http;
mod in_memory;

pub use envelope::Envelope;
pub use http::HttpMarketApi;
pub use in_memory::InMemoryMarketApi;
// endregion: --- Imports

// region:    --- Market Api Trait
/// Remote marketplace service.
///
/// Every mutation either succeeds on the service or returns an error and
/// changes nothing locally. Callers refetch after a success.
#[async_trait]
pub trait MarketApi: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> Result<SessionState>;
    async fn admin_login(&self, req: &AdminLoginRequest) -> Result<SessionState>;
    async fn register(&self, req: &RegisterRequest) -> Result<RegisteredAccount>;
    async fn logout(&self) -> Result<()>;
    fn session(&self) -> SessionState;
    /// Drops the local session without telling the service.
    fn clear_session(&self);

    async fn fetch_items(&self) -> Result<Vec<Item>>;
    async fn create_item(&self, listing: &NewListing) -> Result<()>;
    async fn delete_item(&self, item_id: &str) -> Result<()>;

    async fn fetch_bids(&self) -> Result<Vec<Bid>>;
    async fn submit_bid(&self, bid: &NewBid) -> Result<()>;

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>>;
    async fn create_conversation(&self, req: &NewConversation) -> Result<Conversation>;
    async fn post_message(&self, msg: &NewMessage) -> Result<Message>;
    /// Marks every message addressed to `reader_id` in the conversation as read. Idempotent.
    async fn mark_read(&self, conversation_id: &str, reader_id: &str) -> Result<()>;

    async fn admin_stats(&self) -> Result<AdminStats>;
    async fn admin_analytics(&self) -> Result<Analytics>;
    async fn fetch_users(&self) -> Result<Vec<User>>;
    async fn update_user_status(&self, user_id: &str, status: UserStatus) -> Result<()>;
}

pub type SharedMarketApi = Arc<dyn MarketApi>;
// endregion: --- Market Api Trait
