//! ChatDigest core: buffers group chat messages and summarizes the backlog
//! on request.
//!
//! - [`channel`]: chat platform abstraction and the Telegram adapter
//! - [`digest`]: the conversation buffer and the summarization pipeline
//! - [`runtime`]: message routing, commands and the receive loop

pub mod channel;
pub mod digest;
pub mod runtime;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use channel::Channel;
use digest::{ConversationBuffer, PipelineConfig, SummarizationPipeline, Summarizer};
use runtime::{MessageHandler, MessageHandlerConfig};

/// Bot state shared by the receive loop and command tasks
///
/// The buffer is created once here and handed to everything that needs it.
pub struct AppCore {
    pub buffer: Arc<ConversationBuffer>,
    pub pipeline: Arc<SummarizationPipeline>,
    pub handler: Arc<MessageHandler>,
    channel: Arc<dyn Channel>,
}

impl AppCore {
    pub fn new(
        channel: Arc<dyn Channel>,
        summarizer: Arc<dyn Summarizer>,
        pipeline_config: PipelineConfig,
        handler_config: MessageHandlerConfig,
    ) -> Self {
        let buffer = Arc::new(ConversationBuffer::new());
        let pipeline = Arc::new(SummarizationPipeline::new(
            buffer.clone(),
            summarizer,
            channel.clone(),
            pipeline_config,
        ));
        let handler = Arc::new(MessageHandler::new(
            channel.clone(),
            pipeline.clone(),
            handler_config,
        ));

        info!(
            "Initializing ChatDigest (max_records={}, overflow_policy={})",
            pipeline_config.max_records, pipeline_config.overflow_policy
        );

        Self {
            buffer,
            pipeline,
            handler,
            channel,
        }
    }

    /// Start consuming the channel's inbound messages
    pub fn start(&self) -> JoinHandle<()> {
        runtime::start_message_handler(self.channel.clone(), self.handler.clone())
    }
}
