//! Summarization pipeline.
//!
//! One summarize request runs as: drain the backlog, cap it, ask the
//! summarizer, then either deliver the summary privately or put the drained
//! records back and report the failure. The drained records are held by a
//! scope guard until the summarizer succeeds, so a failed call and a dropped
//! future both restore them.

use scopeguard::ScopeGuard;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::channel::{Channel, OutboundMessage};

use super::buffer::ConversationBuffer;
use super::error::SummarizeError;
use super::record::render_transcript;
use super::summarizer::Summarizer;

/// Default number of records sent to the summarizer per request
pub const DEFAULT_MAX_RECORDS: usize = 100;

pub const NOTHING_TO_SUMMARIZE_NOTICE: &str = "No new messages to summarize";
pub const CANNOT_DELIVER_NOTICE: &str =
    "I can't message you privately. Start a private chat with the bot and try again!";

/// What happens to drained records beyond the processing cap after a
/// successful summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Discard them together with the summarized records
    #[default]
    Drop,
    /// Put them back at the front of the backlog for the next request
    Requeue,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Requeue => write!(f, "requeue"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "requeue" => Ok(Self::Requeue),
            other => Err(format!(
                "unknown overflow policy '{}', expected 'drop' or 'requeue'",
                other
            )),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum records sent to the summarizer per request (at least 1)
    pub max_records: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }
}

/// One `/summarize` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizeRequest {
    /// Buffer key of the conversation to summarize
    pub conversation_id: String,
    /// User the summary is delivered to
    pub requester_id: String,
    /// Conversation title used in the summary header
    pub title: String,
    /// Conversation that receives notices
    pub reply_conversation_id: String,
    /// Command message, deleted after a successful delivery
    pub command_message_id: Option<String>,
}

impl SummarizeRequest {
    /// Request issued from inside the conversation being summarized
    pub fn new(
        conversation_id: impl Into<String>,
        requester_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let conversation_id = conversation_id.into();
        Self {
            reply_conversation_id: conversation_id.clone(),
            conversation_id,
            requester_id: requester_id.into(),
            title: title.into(),
            command_message_id: None,
        }
    }

    /// Send notices somewhere other than the summarized conversation
    pub fn with_reply_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.reply_conversation_id = conversation_id.into();
        self
    }

    pub fn with_command_message(mut self, message_id: impl Into<String>) -> Self {
        self.command_message_id = Some(message_id.into());
        self
    }
}

/// Result of the drain/summarize/restore core
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Nothing was buffered
    Empty,
    Summarized {
        summary: String,
        /// Records sent to the summarizer
        summarized: usize,
        /// Records put back because of [`OverflowPolicy::Requeue`]
        requeued: usize,
        /// Records removed from the buffer for good
        cleared: usize,
    },
    /// The summarizer failed and every drained record was put back
    Failed {
        error: SummarizeError,
        restored: usize,
    },
}

/// Result of a full summarize request, including delivery
#[derive(Debug)]
pub enum SummarizeOutcome {
    NothingToSummarize,
    Delivered { summarized: usize, requeued: usize },
    /// The summary was produced but could not reach the requester.
    /// The backlog is not restored.
    DeliveryFailed { summarized: usize },
    SummarizerFailed {
        error: SummarizeError,
        restored: usize,
    },
}

/// Drains a conversation backlog into a summary and delivers it.
pub struct SummarizationPipeline {
    buffer: Arc<ConversationBuffer>,
    summarizer: Arc<dyn Summarizer>,
    channel: Arc<dyn Channel>,
    config: PipelineConfig,
}

impl SummarizationPipeline {
    pub fn new(
        buffer: Arc<ConversationBuffer>,
        summarizer: Arc<dyn Summarizer>,
        channel: Arc<dyn Channel>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            buffer,
            summarizer,
            channel,
            config,
        }
    }

    pub fn buffer(&self) -> &Arc<ConversationBuffer> {
        &self.buffer
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drain, cap and summarize one conversation without delivering anything.
    ///
    /// On summarizer failure the full drained set is restored ahead of
    /// records appended in the meantime. If the returned future is dropped
    /// before the summarizer answers, the records are restored as well.
    pub async fn process(&self, conversation_id: &str) -> ProcessOutcome {
        let drained = self.buffer.drain_all(conversation_id);
        if !drained.existed {
            return ProcessOutcome::Empty;
        }

        let buffer = self.buffer.clone();
        let owner = conversation_id.to_string();
        let pending = scopeguard::guard(drained.records, move |records| {
            debug!(
                "Returning {} unsummarized records to conversation {}",
                records.len(),
                owner
            );
            buffer.restore(&owner, records);
        });

        let summarized = pending.len().min(self.config.max_records.max(1));
        let transcript = render_transcript(&pending[..summarized]);

        match self.summarizer.summarize(&transcript).await {
            Ok(summary) => {
                let mut records = ScopeGuard::into_inner(pending);
                let requeued = match self.config.overflow_policy {
                    OverflowPolicy::Requeue if records.len() > summarized => {
                        let overflow = records.split_off(summarized);
                        let count = overflow.len();
                        self.buffer.restore(conversation_id, overflow);
                        count
                    }
                    _ => 0,
                };

                ProcessOutcome::Summarized {
                    summary,
                    summarized,
                    requeued,
                    cleared: records.len(),
                }
            }
            Err(error) => {
                let restored = pending.len();
                drop(pending);
                ProcessOutcome::Failed { error, restored }
            }
        }
    }

    /// Run a full summarize request and report the result in the chat.
    pub async fn summarize(&self, request: &SummarizeRequest) -> SummarizeOutcome {
        match self.process(&request.conversation_id).await {
            ProcessOutcome::Empty => {
                debug!(
                    "Nothing buffered for conversation {}",
                    request.conversation_id
                );
                self.notify(
                    request,
                    OutboundMessage::info(
                        &request.reply_conversation_id,
                        NOTHING_TO_SUMMARIZE_NOTICE,
                    ),
                )
                .await;
                SummarizeOutcome::NothingToSummarize
            }
            ProcessOutcome::Failed { error, restored } => {
                warn!(
                    "Summarizing conversation {} failed, restored {} records: {}",
                    request.conversation_id, restored, error
                );
                self.notify(
                    request,
                    OutboundMessage::warning(
                        &request.reply_conversation_id,
                        format!("Processing error: {}", error),
                    ),
                )
                .await;
                SummarizeOutcome::SummarizerFailed { error, restored }
            }
            ProcessOutcome::Summarized {
                summary,
                summarized,
                requeued,
                cleared,
            } => {
                info!(
                    "Summarized conversation {} ({} records, {} requeued, {} cleared)",
                    request.conversation_id, summarized, requeued, cleared
                );
                self.deliver(request, &summary, summarized, requeued).await
            }
        }
    }

    async fn deliver(
        &self,
        request: &SummarizeRequest,
        summary: &str,
        summarized: usize,
        requeued: usize,
    ) -> SummarizeOutcome {
        let message = OutboundMessage::new(
            &request.requester_id,
            format!("📌 Summary from chat {}\n\n{}", request.title, summary),
        );

        if let Err(e) = self.channel.send(message).await {
            warn!(
                "Could not deliver summary to {}: {}",
                request.requester_id, e
            );
            self.notify(
                request,
                OutboundMessage::error(&request.reply_conversation_id, CANNOT_DELIVER_NOTICE),
            )
            .await;
            return SummarizeOutcome::DeliveryFailed { summarized };
        }

        if let Some(message_id) = &request.command_message_id
            && let Err(e) = self
                .channel
                .delete_message(&request.reply_conversation_id, message_id)
                .await
        {
            debug!("Could not delete command message {}: {}", message_id, e);
        }

        SummarizeOutcome::Delivered {
            summarized,
            requeued,
        }
    }

    async fn notify(&self, request: &SummarizeRequest, message: OutboundMessage) {
        let message = message.replying_to(request.command_message_id.as_deref());
        if let Err(e) = self.channel.send(message).await {
            warn!(
                "Failed to post notice in {}: {}",
                request.reply_conversation_id, e
            );
        }
    }
}
