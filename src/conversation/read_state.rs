use crate::api::SharedMarketApi;
use crate::cache::MarketCache;
use crate::conversation::model::Conversation;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Messages addressed to `user_id` that are not yet read.
pub fn unread_count(conversation: &Conversation, user_id: &str) -> usize {
    conversation
        .messages
        .iter()
        .filter(|m| m.receiver == user_id && !m.read)
        .count()
}

/// Total unread across every conversation, for the inbox badge.
pub fn total_unread(conversations: &[Conversation], user_id: &str) -> usize {
    conversations.iter().map(|c| unread_count(c, user_id)).sum()
}

/// Marks conversations read on the service when they are opened.
#[derive(Clone)]
pub struct ReadTracker {
    api: SharedMarketApi,
    cache: Arc<MarketCache>,
}

impl ReadTracker {
    pub fn new(api: SharedMarketApi, cache: Arc<MarketCache>) -> Self {
        Self { api, cache }
    }

    /// Starts the mark-read call and returns without waiting for it.
    ///
    /// Failures are logged only. On success the cached copy is flipped too,
    /// so the unread count drops to zero without waiting for the next poll.
    pub fn open_conversation(&self, conversation_id: &str, reader_id: &str) -> JoinHandle<()> {
        let api = self.api.clone();
        let cache = self.cache.clone();
        let conversation_id = conversation_id.to_string();
        let reader_id = reader_id.to_string();

        tokio::spawn(async move {
            match api.mark_read(&conversation_id, &reader_id).await {
                Ok(()) => {
                    let changed = cache.mark_read(&conversation_id, &reader_id);
                    info!(
                        "{:<12} --> {} marked {} messages read in {}",
                        "ReadState", reader_id, changed, conversation_id
                    );
                }
                Err(e) => error!(
                    "{:<12} --> mark read failed for {}: {}",
                    "ReadState", conversation_id, e
                ),
            }
        })
    }
}
