// region:    --- Imports
use crate::api::SharedMarketApi;
use crate::cache::MarketCache;
use crate::conversation::model::{Conversation, Message, NewConversation, NewMessage};
use crate::conversation::read_state::unread_count;
use crate::error::{MarketError, Result};
use crate::user::UserRef;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
// endregion: --- Imports

// region:    --- Resolution
/// The conversation between `me` and `other`, whichever order the participants are stored in.
pub fn find_conversation<'a>(
    conversations: &'a [Conversation],
    me: &str,
    other: &str,
) -> Option<&'a Conversation> {
    conversations.iter().find(|c| c.is_between(me, other))
}

/// Union of two message lists keyed by id, ascending by `createdAt`.
/// A message present on both sides keeps the `server` copy.
pub fn merge_messages(local: Vec<Message>, server: Vec<Message>) -> Vec<Message> {
    let mut by_id: HashMap<String, Message> = HashMap::with_capacity(local.len() + server.len());
    for message in local.into_iter().chain(server) {
        by_id.insert(message.id.clone(), message);
    }
    let mut merged: Vec<Message> = by_id.into_values().collect();
    merged.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    merged
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
// endregion: --- Resolution

// region:    --- Inbox
/// One row of the inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub other: Option<UserRef>,
    pub last_message: Option<Message>,
    pub unread: usize,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSummary {
    fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.updated_at)
    }
}

/// Summaries of every conversation `me` takes part in, most recent first.
/// A non-empty `query` keeps only those whose other participant's name contains it.
pub fn inbox(conversations: &[Conversation], me: &str, query: &str) -> Vec<ConversationSummary> {
    let query = query.trim().to_lowercase();
    let mut summaries: Vec<ConversationSummary> = conversations
        .iter()
        .filter(|c| c.has_participant(me))
        .map(|c| ConversationSummary {
            conversation_id: c.id.clone(),
            other: c.other_participant(me).cloned(),
            last_message: c.last_message().cloned(),
            unread: unread_count(c, me),
            updated_at: c.updated_at,
        })
        .filter(|s| {
            query.is_empty()
                || s.other
                    .as_ref()
                    .is_some_and(|o| o.name().to_lowercase().contains(&query))
        })
        .collect();
    summaries.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
    summaries
}
// endregion: --- Inbox

// region:    --- Conversation Resolver
/// Finds or creates the one conversation per user pair and sends messages into it.
pub struct ConversationResolver {
    api: SharedMarketApi,
    cache: Arc<MarketCache>,
    locks: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationResolver {
    pub fn new(api: SharedMarketApi, cache: Arc<MarketCache>) -> Self {
        Self {
            api,
            cache,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The cached conversation with `other`, messages oldest first.
    pub fn open(&self, me: &str, other: &str) -> Option<Conversation> {
        let conversations = self.cache.conversations();
        let mut conversation = find_conversation(&conversations, me, other)?.clone();
        conversation.messages = merge_messages(Vec::new(), conversation.messages);
        Some(conversation)
    }

    pub fn inbox(&self, me: &str, query: &str) -> Vec<ConversationSummary> {
        inbox(&self.cache.conversations(), me, query)
    }

    /// Sends `content` from `me` to `other`, creating their conversation first
    /// if neither the cache nor the service has one.
    pub async fn send_message(&self, me: &str, other: &str, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MarketError::Validation("Message cannot be empty".to_string()));
        }
        if me == other {
            return Err(MarketError::Validation(
                "You cannot message yourself".to_string(),
            ));
        }

        let pair_lock = self.pair_lock(me, other);
        let sent = {
            let _pair = pair_lock.lock().await;
            self.send_in_pair(me, other, content).await
        };
        self.release_pair(me, other, pair_lock);
        sent
    }

    async fn send_in_pair(&self, me: &str, other: &str, content: &str) -> Result<Message> {
        let conversation_id = self.resolve_or_create(me, other).await?;
        let message = self
            .api
            .post_message(&NewMessage {
                conversation_id: conversation_id.clone(),
                sender: me.to_string(),
                receiver: other.to_string(),
                content: content.to_string(),
            })
            .await?;
        info!(
            "{:<12} --> message {} posted to {}",
            "Command", message.id, conversation_id
        );

        if !self.cache.append_message(&conversation_id, message.clone()) {
            debug!(
                "{:<12} --> conversation {} not cached, refetching",
                "Command", conversation_id
            );
            self.cache
                .replace_conversations(self.api.fetch_conversations().await?);
        }
        Ok(message)
    }

    async fn resolve_or_create(&self, me: &str, other: &str) -> Result<String> {
        if let Some(conversation) = find_conversation(&self.cache.conversations(), me, other) {
            return Ok(conversation.id.clone());
        }

        self.cache
            .replace_conversations(self.api.fetch_conversations().await?);
        if let Some(conversation) = find_conversation(&self.cache.conversations(), me, other) {
            debug!(
                "{:<12} --> found {} after refetch",
                "Command", conversation.id
            );
            return Ok(conversation.id.clone());
        }

        let created = self
            .api
            .create_conversation(&NewConversation {
                participants: [me.to_string(), other.to_string()],
            })
            .await?;
        info!(
            "{:<12} --> conversation {} created for {} and {}",
            "Command", created.id, me, other
        );
        let id = created.id.clone();
        self.cache.upsert_conversation(created);
        Ok(id)
    }

    fn pair_lock(&self, a: &str, b: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(pair_key(a, b))
            .or_default()
            .clone()
    }

    /// Drops the pair's entry once no other send holds or waits on it.
    fn release_pair(&self, a: &str, b: &str, pair_lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(pair_lock);
        let key = pair_key(a, b);
        if locks.get(&key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&key);
        }
    }
}
// endregion: --- Conversation Resolver
