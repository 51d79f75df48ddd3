//! Message Router - Decides what to do with each inbound message.
//!
//! Plain group text is buffered, commands are handled, and everything else
//! (private chatter, broadcast posts, commands meant for another bot) is
//! ignored.

use crate::channel::InboundMessage;

/// Routing decision for an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Append the message to its conversation backlog.
    Buffer,
    /// Handle as a command (e.g., /summarize, /help).
    HandleCommand { command: String, args: Vec<String> },
    /// Ignore the message (no action needed).
    Ignore,
}

/// Message router that determines how to handle inbound messages.
///
/// The router checks:
/// 1. Is the message a command (starts with prefix)? → Handle as command,
///    unless it is addressed to a different bot
/// 2. Was it posted in a group? → Buffer
/// 3. Otherwise → Ignore
pub struct MessageRouter {
    command_prefix: String,
    bot_username: Option<String>,
}

impl MessageRouter {
    /// Create a new MessageRouter.
    pub fn new(command_prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: command_prefix.into(),
            bot_username: None,
        }
    }

    /// Only accept `/command@name` forms addressed to this bot
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        let username = username.trim_start_matches('@');
        self.bot_username = (!username.is_empty()).then(|| username.to_lowercase());
        self
    }

    /// Route an inbound message to the appropriate handler.
    pub fn route(&self, message: &InboundMessage) -> RouteDecision {
        if message.content.starts_with(&self.command_prefix) {
            return match self.parse_command(&message.content) {
                Some((command, args)) => RouteDecision::HandleCommand { command, args },
                None => RouteDecision::Ignore,
            };
        }

        if message.conversation_kind.is_group() {
            RouteDecision::Buffer
        } else {
            RouteDecision::Ignore
        }
    }

    /// Parse a command message into command name and arguments.
    ///
    /// `/summarize@digest_bot` yields `summarize` when this bot is
    /// `digest_bot` (or its name is unknown) and `None` otherwise.
    fn parse_command(&self, content: &str) -> Option<(String, Vec<String>)> {
        let trimmed = content.strip_prefix(&self.command_prefix)?;
        let parts: Vec<&str> = trimmed.split_whitespace().collect();

        let first = parts.first()?.to_lowercase();
        let command = match first.split_once('@') {
            Some((command, target)) => {
                if let Some(bot) = &self.bot_username
                    && bot != target
                {
                    return None;
                }
                command.to_string()
            }
            None => first,
        };

        if command.is_empty() {
            return None;
        }

        let args: Vec<String> = parts[1..].iter().map(|s| s.to_string()).collect();

        Some((command, args))
    }
}
