use super::MarketApi;
use crate::admin::{AdminLoginRequest, AdminStats, Analytics, UserStatus};
use crate::auction::ItemStatus;
use crate::bidding::model::{Bid, Item, NewBid, NewListing};
use crate::conversation::model::{Conversation, Message, NewConversation, NewMessage};
use crate::error::{MarketError, Result};
use crate::session::{
    reduce, LoginRequest, RegisterRequest, RegisteredAccount, SessionAction, SessionState,
};
use crate::user::{Role, User, UserRef};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
struct State {
    items: Vec<Item>,
    conversations: Vec<Conversation>,
    users: Vec<User>,
    session: SessionState,
    next_id: u64,
    failures: HashMap<&'static str, VecDeque<String>>,
    calls: HashMap<&'static str, usize>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    /// Counts the call and pops a scripted failure for `op`, if one is queued.
    fn enter(&mut self, op: &'static str) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.get_mut(op).and_then(VecDeque::pop_front) {
            Some(message) => Err(MarketError::Rejected(message)),
            None => Ok(()),
        }
    }

    fn user_ref(&self, id: &str) -> UserRef {
        self.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .map(UserRef::Resolved)
            .unwrap_or_else(|| UserRef::Reference(id.to_string()))
    }
}

/// A marketplace service held in process memory.
///
/// Behaves like the remote service closely enough to drive the client flows:
/// bids below the current price are refused, conversation creation is not
/// idempotent, and failures can be scripted per operation with [`fail_next`].
///
/// [`fail_next`]: InMemoryMarketApi::fail_next
#[derive(Default)]
pub struct InMemoryMarketApi {
    state: Mutex<State>,
}

impl InMemoryMarketApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(self, users: Vec<User>) -> Self {
        self.state.lock().users = users;
        self
    }

    pub fn with_items(self, items: Vec<Item>) -> Self {
        self.state.lock().items = items;
        self
    }

    pub fn with_conversations(self, conversations: Vec<Conversation>) -> Self {
        self.state.lock().conversations = conversations;
        self
    }

    /// Makes the next call to `op` (the trait method name) fail with `message`.
    pub fn fail_next(&self, op: &'static str, message: impl Into<String>) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(message.into());
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().conversations.clone()
    }

    pub fn items(&self) -> Vec<Item> {
        self.state.lock().items.clone()
    }

    fn sign_in(&self, op: &'static str, email: &str, admin_only: bool) -> Result<SessionState> {
        let mut state = self.state.lock();
        state.enter(op)?;
        let user = state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| MarketError::Unauthorized("Invalid email or password".to_string()))?;
        if admin_only && !user.is_admin() {
            return Err(MarketError::Unauthorized("Admin access required".to_string()));
        }
        let token = state.next_id("token-");
        let session = reduce(
            std::mem::take(&mut state.session),
            SessionAction::SetCredentials {
                user,
                token,
                refresh_token: None,
            },
        );
        state.session = session.clone();
        Ok(session)
    }
}

#[async_trait]
impl MarketApi for InMemoryMarketApi {
    async fn login(&self, req: &LoginRequest) -> Result<SessionState> {
        self.sign_in("login", &req.email, false)
    }

    async fn admin_login(&self, req: &AdminLoginRequest) -> Result<SessionState> {
        self.sign_in("admin_login", &req.email, true)
    }

    async fn register(&self, req: &RegisterRequest) -> Result<RegisteredAccount> {
        let mut state = self.state.lock();
        state.enter("register")?;
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&req.email)) {
            return Err(MarketError::Rejected("Email already registered".to_string()));
        }
        let id = state.next_id("u");
        state.users.push(User {
            id: id.clone(),
            name: req.name.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            roles: [Role::Student].into_iter().collect(),
            campus: req.campus.clone(),
            avatar: None,
            created_at: Utc::now(),
        });
        Ok(RegisteredAccount {
            id,
            email: req.email.clone(),
            active: true,
        })
    }

    async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("logout")?;
        state.session = SessionState::default();
        Ok(())
    }

    fn session(&self) -> SessionState {
        self.state.lock().session.clone()
    }

    fn clear_session(&self) {
        let mut state = self.state.lock();
        state.session = reduce(std::mem::take(&mut state.session), SessionAction::Logout);
    }

    async fn fetch_items(&self) -> Result<Vec<Item>> {
        let mut state = self.state.lock();
        state.enter("fetch_items")?;
        Ok(state.items.clone())
    }

    async fn create_item(&self, listing: &NewListing) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("create_item")?;
        let id = state.next_id("i");
        let seller = state.user_ref(&listing.seller);
        state.items.push(Item {
            id,
            title: listing.title.clone(),
            description: listing.description.clone(),
            images: listing
                .images
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            category: listing.category.clone(),
            condition: listing.condition,
            starting_price: listing.starting_price,
            current_price: None,
            start_time: listing.start_time,
            end_time: listing.end_time,
            seller: Some(seller),
            status: ItemStatus::Active,
            bids: vec![],
            campus: listing.campus.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete_item(&self, item_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("delete_item")?;
        let before = state.items.len();
        state.items.retain(|i| i.id != item_id);
        if state.items.len() == before {
            return Err(MarketError::NotFound(format!("Item {}", item_id)));
        }
        Ok(())
    }

    async fn fetch_bids(&self) -> Result<Vec<Bid>> {
        let mut state = self.state.lock();
        state.enter("fetch_bids")?;
        Ok(state.items.iter().flat_map(|i| i.bids.clone()).collect())
    }

    async fn submit_bid(&self, bid: &NewBid) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("submit_bid")?;
        let id = state.next_id("b");
        let bidder = state.user_ref(&bid.bidder);
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == bid.item)
            .ok_or_else(|| MarketError::NotFound(format!("Item {}", bid.item)))?;
        if item.status != ItemStatus::Active || Utc::now() >= item.end_time {
            return Err(MarketError::Rejected("Auction has ended".to_string()));
        }
        if bid.amount <= item.effective_price() {
            return Err(MarketError::Rejected(
                "Bid must be higher than the current price".to_string(),
            ));
        }
        item.current_price = Some(bid.amount);
        item.bids.push(Bid {
            id,
            item: bid.item.clone(),
            bidder: Some(bidder),
            amount: bid.amount,
            created_at: bid.created_at,
        });
        Ok(())
    }

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>> {
        let mut state = self.state.lock();
        state.enter("fetch_conversations")?;
        Ok(state.conversations.clone())
    }

    async fn create_conversation(&self, req: &NewConversation) -> Result<Conversation> {
        let mut state = self.state.lock();
        state.enter("create_conversation")?;
        let now = Utc::now();
        let conversation = Conversation {
            id: state.next_id("c"),
            participants: req.participants.iter().map(|id| state.user_ref(id)).collect(),
            messages: vec![],
            created_at: now,
            updated_at: now,
        };
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn post_message(&self, msg: &NewMessage) -> Result<Message> {
        let mut state = self.state.lock();
        state.enter("post_message")?;
        let id = state.next_id("m");
        let conversation = state
            .conversations
            .iter_mut()
            .find(|c| c.id == msg.conversation_id)
            .ok_or_else(|| MarketError::NotFound(format!("Conversation {}", msg.conversation_id)))?;
        let message = Message {
            id,
            sender: msg.sender.clone(),
            receiver: msg.receiver.clone(),
            item_id: None,
            content: msg.content.clone(),
            read: false,
            created_at: Utc::now(),
        };
        conversation.messages.push(message.clone());
        conversation.updated_at = message.created_at;
        Ok(message)
    }

    async fn mark_read(&self, conversation_id: &str, reader_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("mark_read")?;
        let conversation = state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| MarketError::NotFound(format!("Conversation {}", conversation_id)))?;
        conversation
            .messages
            .iter_mut()
            .filter(|m| m.receiver == reader_id)
            .for_each(|m| m.read = true);
        Ok(())
    }

    async fn admin_stats(&self) -> Result<AdminStats> {
        let mut state = self.state.lock();
        state.enter("admin_stats")?;
        let sold: Vec<&Item> = state
            .items
            .iter()
            .filter(|i| i.status == ItemStatus::Sold)
            .collect();
        Ok(AdminStats {
            total_users: state.users.len() as u64,
            active_listings: state
                .items
                .iter()
                .filter(|i| i.status == ItemStatus::Active)
                .count() as u64,
            total_revenue: sold.iter().map(|i| i.effective_price()).sum(),
            completed_auctions: sold.len() as u64,
        })
    }

    async fn admin_analytics(&self) -> Result<Analytics> {
        let mut state = self.state.lock();
        state.enter("admin_analytics")?;
        let items = &state.items;
        let bids: Vec<&Bid> = items.iter().flat_map(|i| i.bids.iter()).collect();
        let sold = items.iter().filter(|i| i.status == ItemStatus::Sold).count();
        let closed = items.iter().filter(|i| i.status.is_terminal()).count();
        let ratio = |part: usize, whole: usize| {
            if whole == 0 {
                0.0
            } else {
                part as f64 / whole as f64 * 100.0
            }
        };
        let durations: Vec<f64> = items
            .iter()
            .map(|i| (i.end_time - i.start_time).num_hours() as f64 / 24.0)
            .collect();
        Ok(Analytics {
            total_revenue: items
                .iter()
                .filter(|i| i.status == ItemStatus::Sold)
                .map(|i| i.effective_price())
                .sum(),
            active_users: state.users.iter().filter(|u| !u.is_suspended()).count() as u64,
            new_listings: items.len() as u64,
            conversion_rate: ratio(sold, closed),
            total_bids: bids.len() as u64,
            average_bid_amount: if bids.is_empty() {
                0.0
            } else {
                bids.iter().map(|b| b.amount).sum::<f64>() / bids.len() as f64
            },
            completion_rate: ratio(closed, items.len()),
            average_listing_duration: if durations.is_empty() {
                0.0
            } else {
                durations.iter().sum::<f64>() / durations.len() as f64
            },
        })
    }

    async fn fetch_users(&self) -> Result<Vec<User>> {
        let mut state = self.state.lock();
        state.enter("fetch_users")?;
        Ok(state.users.clone())
    }

    async fn update_user_status(&self, user_id: &str, status: UserStatus) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("update_user_status")?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| MarketError::NotFound(format!("User {}", user_id)))?;
        let mut roles: Vec<Role> = user
            .roles
            .iter()
            .filter(|r| **r != Role::Suspended)
            .cloned()
            .collect();
        match status {
            UserStatus::Active => {}
            UserStatus::Suspended => roles.push(Role::Suspended),
            UserStatus::Admin => roles.push(Role::Admin),
        }
        user.roles = roles.into_iter().collect();
        Ok(())
    }
}
