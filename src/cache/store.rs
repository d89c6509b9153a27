// region:    --- Imports
use super::EntityState;
use crate::bidding::model::{Bid, Item};
use crate::conversation::model::{Conversation, Message};
use crate::conversation::resolver::merge_messages;
use crate::user::{User, UserRef};
use parking_lot::RwLock;
use tracing::debug;
// endregion: --- Imports

// region:    --- Market Cache
/// Process-lifetime cache of everything fetched from the service.
///
/// Refreshes replace a whole collection (last write wins). User references
/// inside items, bids and conversations are resolved against the user table on
/// the way in, and embedded user objects are added to that table.
#[derive(Default)]
pub struct MarketCache {
    items: RwLock<EntityState<Item>>,
    bids: RwLock<EntityState<Bid>>,
    conversations: RwLock<EntityState<Conversation>>,
    users: RwLock<EntityState<User>>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Ingest

    pub fn replace_items(&self, mut items: Vec<Item>) {
        for item in &items {
            self.remember_refs(item.seller.iter());
            self.remember_refs(item.bids.iter().filter_map(|b| b.bidder.as_ref()));
        }
        for item in &mut items {
            self.resolve_opt(&mut item.seller);
            for bid in &mut item.bids {
                self.resolve_opt(&mut bid.bidder);
            }
        }
        debug!("{:<12} --> items replaced: {}", "Cache", items.len());
        self.items.write().set_all(items);
    }

    pub fn replace_bids(&self, mut bids: Vec<Bid>) {
        self.remember_refs(bids.iter().filter_map(|b| b.bidder.as_ref()));
        for bid in &mut bids {
            self.resolve_opt(&mut bid.bidder);
        }
        debug!("{:<12} --> bids replaced: {}", "Cache", bids.len());
        self.bids.write().set_all(bids);
    }

    pub fn replace_conversations(&self, mut conversations: Vec<Conversation>) {
        for conversation in &mut conversations {
            self.prepare_conversation(conversation);
        }
        debug!(
            "{:<12} --> conversations replaced: {}",
            "Cache",
            conversations.len()
        );
        self.conversations.write().set_all(conversations);
    }

    pub fn upsert_conversation(&self, mut conversation: Conversation) {
        self.prepare_conversation(&mut conversation);
        self.conversations.write().upsert(conversation);
    }

    /// Replaces the user table and re-resolves every cached reference against it.
    pub fn replace_users(&self, users: Vec<User>) {
        self.users.write().set_all(users);
        let items = self.items();
        self.replace_items(items);
        let bids = self.bids();
        self.replace_bids(bids);
        let conversations = self.conversations();
        self.replace_conversations(conversations);
    }

    pub fn remember_user(&self, user: User) {
        self.users.write().upsert(user);
    }

    /// Merges a confirmed message into its cached conversation.
    /// Returns false when the conversation is not cached.
    pub fn append_message(&self, conversation_id: &str, message: Message) -> bool {
        let mut conversations = self.conversations.write();
        match conversations.get_mut(conversation_id) {
            Some(conversation) => {
                let local = std::mem::take(&mut conversation.messages);
                conversation.updated_at = conversation.updated_at.max(message.created_at);
                conversation.messages = merge_messages(local, vec![message]);
                true
            }
            None => false,
        }
    }

    /// Flags messages addressed to `reader_id` as read. Returns how many changed.
    pub fn mark_read(&self, conversation_id: &str, reader_id: &str) -> usize {
        let mut conversations = self.conversations.write();
        let Some(conversation) = conversations.get_mut(conversation_id) else {
            return 0;
        };
        let mut changed = 0;
        for message in conversation
            .messages
            .iter_mut()
            .filter(|m| m.receiver == reader_id && !m.read)
        {
            message.read = true;
            changed += 1;
        }
        changed
    }

    // -- Snapshots

    pub fn items(&self) -> Vec<Item> {
        self.items.read().all().into_iter().cloned().collect()
    }

    pub fn item(&self, id: &str) -> Option<Item> {
        self.items.read().get(id).cloned()
    }

    pub fn bids(&self) -> Vec<Bid> {
        self.bids.read().all().into_iter().cloned().collect()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations.read().all().into_iter().cloned().collect()
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.conversations.read().get(id).cloned()
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.read().get(id).cloned()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.read().all().into_iter().cloned().collect()
    }

    // -- Reference resolution

    /// Swaps a bare id for the cached user when one is known.
    pub fn resolve(&self, user_ref: &mut UserRef) {
        let known = match user_ref {
            UserRef::Reference(id) => self.users.read().get(id.as_str()).cloned(),
            UserRef::Resolved(_) => None,
        };
        if let Some(user) = known {
            *user_ref = UserRef::Resolved(user);
        }
    }

    fn resolve_opt(&self, user_ref: &mut Option<UserRef>) {
        if let Some(user_ref) = user_ref {
            self.resolve(user_ref);
        }
    }

    fn remember_refs<'a>(&self, refs: impl Iterator<Item = &'a UserRef>) {
        let mut users = self.users.write();
        for user in refs.filter_map(UserRef::user) {
            users.upsert(user.clone());
        }
    }

    fn prepare_conversation(&self, conversation: &mut Conversation) {
        self.remember_refs(conversation.participants.iter());
        for participant in &mut conversation.participants {
            self.resolve(participant);
        }
        let messages = std::mem::take(&mut conversation.messages);
        conversation.messages = merge_messages(Vec::new(), messages);
    }
}
// endregion: --- Market Cache
