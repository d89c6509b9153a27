use crate::user::UserRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: String,
    pub receiver: String,
    #[serde(rename = "itemId", default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A direct conversation between exactly two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    pub participants: Vec<UserRef>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.is(user_id))
    }

    /// True when the participant set is exactly `{a, b}`, in either order.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        let ids: Vec<&str> = self.participants.iter().map(UserRef::id).collect();
        match ids.as_slice() {
            [x, y] => (*x == a && *y == b) || (*x == b && *y == a),
            [only] => a == b && *only == a,
            _ => false,
        }
    }

    /// The participant who is not `user_id`.
    pub fn other_participant(&self, user_id: &str) -> Option<&UserRef> {
        self.participants.iter().find(|p| !p.is(user_id))
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.iter().max_by_key(|m| m.created_at)
    }
}

/// Body of `POST /conversations/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversation {
    pub participants: [String; 2],
}

/// Body of `POST /conversations/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(skip)]
    pub conversation_id: String,
    pub sender: String,
    pub receiver: String,
    pub content: String,
}
