//! Channel Types
//!
//! Message types exchanged between the chat platform adapter and the bot.

use serde::{Deserialize, Serialize};

/// Kind of conversation a message was posted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// One-to-one chat between a user and the bot
    #[default]
    Private,
    /// Group or supergroup
    Group,
    /// Broadcast channel
    Broadcast,
}

impl ConversationKind {
    /// Map a Telegram `chat.type` value
    pub fn from_telegram(chat_type: &str) -> Self {
        match chat_type {
            "group" | "supergroup" => Self::Group,
            "channel" => Self::Broadcast,
            _ => Self::Private,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }
}

/// Message level for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    /// Sent verbatim
    #[default]
    Plain,
    Info,
    Warning,
    Error,
}

impl MessageLevel {
    /// Get emoji representation for the message level
    pub fn emoji(&self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Info => Some("ℹ️"),
            Self::Warning => Some("⚠️"),
            Self::Error => Some("❌"),
        }
    }
}

/// Inbound message from a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Unique message ID
    pub id: String,
    /// Sender identifier (user ID in the channel)
    pub sender_id: String,
    /// Sender display name (if available)
    pub sender_name: Option<String>,
    /// Conversation identifier (chat_id, or chat_id:thread_id for forum topics)
    pub conversation_id: String,
    /// Kind of conversation
    pub conversation_kind: ConversationKind,
    /// Conversation title (groups only)
    pub conversation_title: Option<String>,
    /// Message content
    pub content: String,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            conversation_id: conversation_id.into(),
            conversation_kind: ConversationKind::Private,
            conversation_title: None,
            content: content.into(),
        }
    }

    /// Set sender name
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Mark as posted in a group with the given title
    pub fn in_group(mut self, title: impl Into<String>) -> Self {
        self.conversation_kind = ConversationKind::Group;
        self.conversation_title = Some(title.into());
        self
    }

    /// Set conversation kind
    pub fn with_kind(mut self, kind: ConversationKind) -> Self {
        self.conversation_kind = kind;
        self
    }

    /// Display name used when the message is quoted back, falling back to the sender id
    pub fn author(&self) -> &str {
        self.sender_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.sender_id)
    }

    /// Title used in summary headers
    pub fn title(&self) -> &str {
        self.conversation_title
            .as_deref()
            .unwrap_or(&self.conversation_id)
    }
}

/// Outbound message to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Conversation identifier
    pub conversation_id: String,
    /// Message content
    pub content: String,
    /// Message level for formatting
    pub level: MessageLevel,
    /// Reply to specific message
    pub reply_to: Option<String>,
}

impl OutboundMessage {
    /// Create a new plain outbound message
    pub fn new(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
            level: MessageLevel::Plain,
            reply_to: None,
        }
    }

    /// Set message level
    pub fn with_level(mut self, level: MessageLevel) -> Self {
        self.level = level;
        self
    }

    /// Set reply_to
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Set reply_to when a message id is known
    pub fn replying_to(mut self, reply_to: Option<&str>) -> Self {
        self.reply_to = reply_to.map(str::to_string);
        self
    }

    /// Create an informational notice
    pub fn info(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, content).with_level(MessageLevel::Info)
    }

    /// Create an error notice
    pub fn error(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, content).with_level(MessageLevel::Error)
    }

    /// Create a warning notice
    pub fn warning(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, content).with_level(MessageLevel::Warning)
    }

    /// Format the message with emoji prefix based on level
    pub fn formatted_content(&self) -> String {
        match self.level.emoji() {
            Some(emoji) => format!("{} {}", emoji, self.content),
            None => self.content.clone(),
        }
    }
}
