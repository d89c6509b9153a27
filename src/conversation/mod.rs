pub mod model;
pub mod read_state;
pub mod resolver;

pub use read_state::{unread_count, ReadTracker};
pub use resolver::{find_conversation, merge_messages, ConversationResolver, ConversationSummary};
