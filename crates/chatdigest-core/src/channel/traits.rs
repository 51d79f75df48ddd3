//! Channel Trait Definitions
//!
//! Defines the delivery capability the digest pipeline talks to.

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::types::{InboundMessage, OutboundMessage};

/// Stream of inbound messages produced by a receiving channel
pub type InboundStream = Pin<Box<dyn Stream<Item = InboundMessage> + Send>>;

/// Communication channel trait
///
/// Implemented by chat platform adapters. The digest pipeline only needs
/// `send` and `delete_message`; the runtime additionally consumes
/// `start_receiving`.
///
/// # Example
///
/// ```ignore
/// struct MyChannel { /* ... */ }
///
/// #[async_trait]
/// impl Channel for MyChannel {
///     fn name(&self) -> &str {
///         "my-channel"
///     }
///
///     fn is_configured(&self) -> bool {
///         !self.token.is_empty()
///     }
///
///     async fn send(&self, message: OutboundMessage) -> Result<()> {
///         // Send message via API
///         Ok(())
///     }
///
///     async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()> {
///         Ok(())
///     }
///
///     fn start_receiving(&self) -> Option<InboundStream> {
///         None
///     }
/// }
/// ```
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get channel display name
    fn name(&self) -> &str;

    /// Check if channel is properly configured
    fn is_configured(&self) -> bool;

    /// Send a message to the channel
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Send a simple text message
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
        self.send(OutboundMessage::new(conversation_id, text)).await
    }

    /// Delete a previously received message
    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()>;

    /// Start receiving messages (returns None if channel doesn't support receiving)
    ///
    /// The returned stream is fed by a background task.
    fn start_receiving(&self) -> Option<InboundStream>;
}

/// Test/mock channel for unit testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// A mock channel that records everything sent through it
    ///
    /// Conversations marked as unreachable reject `send`, which mimics a user
    /// who never opened a private chat with the bot.
    #[derive(Default)]
    pub struct MockChannel {
        sent_messages: Arc<Mutex<Vec<OutboundMessage>>>,
        deleted_messages: Arc<Mutex<Vec<(String, String)>>>,
        unreachable: Arc<Mutex<HashSet<String>>>,
        fail_deletes: bool,
    }

    impl MockChannel {
        /// Create a new mock channel
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every `delete_message` call fail
        pub fn failing_deletes(mut self) -> Self {
            self.fail_deletes = true;
            self
        }

        /// Reject sends to the given conversation
        pub async fn mark_unreachable(&self, conversation_id: &str) {
            self.unreachable
                .lock()
                .await
                .insert(conversation_id.to_string());
        }

        /// Get all sent messages
        pub async fn get_sent_messages(&self) -> Vec<OutboundMessage> {
            self.sent_messages.lock().await.clone()
        }

        /// Get sent messages addressed to one conversation
        pub async fn sent_to(&self, conversation_id: &str) -> Vec<OutboundMessage> {
            self.sent_messages
                .lock()
                .await
                .iter()
                .filter(|m| m.conversation_id == conversation_id)
                .cloned()
                .collect()
        }

        /// Get all deleted (conversation_id, message_id) pairs
        pub async fn get_deleted_messages(&self) -> Vec<(String, String)> {
            self.deleted_messages.lock().await.clone()
        }
    }

    #[async_trait]
    impl Channel for MockChannel {
        fn name(&self) -> &str {
            "mock"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, message: OutboundMessage) -> Result<()> {
            if self
                .unreachable
                .lock()
                .await
                .contains(&message.conversation_id)
            {
                anyhow::bail!("Forbidden: bot can't initiate conversation with a user");
            }
            self.sent_messages.lock().await.push(message);
            Ok(())
        }

        async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()> {
            if self.fail_deletes {
                anyhow::bail!("Bad Request: message can't be deleted");
            }
            self.deleted_messages
                .lock()
                .await
                .push((conversation_id.to_string(), message_id.to_string()));
            Ok(())
        }

        fn start_receiving(&self) -> Option<InboundStream> {
            None
        }
    }
}
