//! Tracks which group each user last posted in.
//!
//! A `/summarize` sent in a private chat has no group of its own; it targets
//! the group where the caller most recently wrote a buffered message.

use parking_lot::RwLock;
use std::collections::HashMap;

/// A group conversation as seen from the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    pub conversation_id: String,
    pub title: String,
}

/// In-memory map from user id to their latest group.
///
/// Entries are never evicted, so it grows by one small entry per distinct
/// user the bot has seen in a group. It is cleared on restart.
#[derive(Debug, Default)]
pub struct ConversationDirectory {
    last_group: RwLock<HashMap<String, GroupRef>>,
}

impl ConversationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `user_id` just posted in the given group
    pub fn record(&self, user_id: &str, conversation_id: &str, title: &str) {
        self.last_group.write().insert(
            user_id.to_string(),
            GroupRef {
                conversation_id: conversation_id.to_string(),
                title: title.to_string(),
            },
        );
    }

    /// Group the user posted in most recently, if any
    pub fn lookup(&self, user_id: &str) -> Option<GroupRef> {
        self.last_group.read().get(user_id).cloned()
    }
}
