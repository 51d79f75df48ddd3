//! Channel Message Handler
//!
//! Consumes the inbound message stream of a channel. Group text is buffered
//! inline; every command runs on its own task so a slow summary never holds
//! up buffering.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_stream::StreamExt;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::channel::{Channel, InboundMessage};
use crate::digest::{MessageRecord, SummarizationPipeline};

use super::commands::{CommandContext, handle_command};
use super::directory::ConversationDirectory;
use super::router::{MessageRouter, RouteDecision};

#[cfg(test)]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Message handler configuration
#[derive(Debug, Clone)]
pub struct MessageHandlerConfig {
    /// Command prefix (default: "/")
    pub command_prefix: String,
    /// Bot username, used to filter `/command@other_bot`
    pub bot_username: Option<String>,
}

impl Default for MessageHandlerConfig {
    fn default() -> Self {
        Self {
            command_prefix: "/".to_string(),
            bot_username: None,
        }
    }
}

/// Routes inbound messages to the buffer or to command handling
pub struct MessageHandler {
    router: MessageRouter,
    commands: Arc<CommandContext>,
    in_flight: TaskTracker,
}

impl MessageHandler {
    pub fn new(
        channel: Arc<dyn Channel>,
        pipeline: Arc<SummarizationPipeline>,
        config: MessageHandlerConfig,
    ) -> Self {
        let mut router = MessageRouter::new(config.command_prefix);
        if let Some(username) = config.bot_username {
            router = router.with_bot_username(username);
        }

        Self {
            router,
            commands: Arc::new(CommandContext {
                channel,
                pipeline,
                directory: Arc::new(ConversationDirectory::new()),
            }),
            in_flight: TaskTracker::new(),
        }
    }

    pub fn directory(&self) -> &Arc<ConversationDirectory> {
        &self.commands.directory
    }

    /// Handle one inbound message.
    ///
    /// Returns the spawned task when the message was a command.
    pub fn dispatch(&self, message: InboundMessage) -> Option<JoinHandle<()>> {
        debug!(
            "Received message {} from {} in {}",
            message.id, message.sender_id, message.conversation_id
        );

        if message.conversation_kind.is_group() {
            self.commands.directory.record(
                &message.sender_id,
                &message.conversation_id,
                message.title(),
            );
        }

        match self.router.route(&message) {
            RouteDecision::Buffer => {
                self.buffer_message(&message);
                None
            }
            RouteDecision::HandleCommand { command, args } => {
                debug!("Routing to command: {} {:?}", command, args);
                let commands = self.commands.clone();
                Some(self.in_flight.spawn(async move {
                    if let Err(e) = handle_command(&commands, &message, &command).await {
                        error!(
                            "Error handling /{} from {} in {}: {}",
                            command, message.sender_id, message.conversation_id, e
                        );
                    }
                }))
            }
            RouteDecision::Ignore => {
                debug!("Ignoring message {}", message.id);
                None
            }
        }
    }

    /// Wait up to `grace` for running commands to finish.
    ///
    /// Returns false if some were still running when the grace period ran
    /// out. Their drained records are not back in the buffer yet.
    pub async fn wait_for_commands(&self, grace: Duration) -> bool {
        self.in_flight.close();
        let finished = timeout(grace, self.in_flight.wait()).await.is_ok();
        self.in_flight.reopen();
        finished
    }

    fn buffer_message(&self, message: &InboundMessage) {
        match MessageRecord::from_inbound(message) {
            Some(record) => self
                .commands
                .pipeline
                .buffer()
                .append(&message.conversation_id, record),
            None => debug!("Skipping empty message {}", message.id),
        }
    }
}

/// Start the message handler loop
///
/// Spawns a background task that listens on the channel and restarts the
/// inbound stream whenever it ends.
pub fn start_message_handler(
    channel: Arc<dyn Channel>,
    handler: Arc<MessageHandler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Listening for messages on {}", channel.name());

        loop {
            let Some(mut stream) = channel.start_receiving() else {
                warn!(
                    "Failed to start message stream for {}, retrying in {:?}",
                    channel.name(),
                    STREAM_RECONNECT_DELAY
                );
                sleep(STREAM_RECONNECT_DELAY).await;
                continue;
            };

            while let Some(message) = stream.next().await {
                handler.dispatch(message);
            }

            warn!(
                "Message stream ended for {}, restarting in {:?}",
                channel.name(),
                STREAM_RECONNECT_DELAY
            );
            sleep(STREAM_RECONNECT_DELAY).await;
        }
    })
}
