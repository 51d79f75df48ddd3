//! Bot Command Handler
//!
//! Handles command messages (/summarize, /pending, /help, /start).

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::channel::{Channel, InboundMessage, OutboundMessage};
use crate::digest::{SummarizationPipeline, SummarizeOutcome, SummarizeRequest};

use super::directory::ConversationDirectory;

const HELP_TEXT: &str = "🤖 ChatDigest

Add me to a group and I will quietly collect its messages.

Commands:
/summarize - Summarize unread group messages and send the summary to you privately
/pending - Show how many messages are waiting to be summarized
/help - Show this help

Start a private chat with me first, otherwise I can't send you summaries.";

/// Everything a command needs to run
pub struct CommandContext {
    pub channel: Arc<dyn Channel>,
    pub pipeline: Arc<SummarizationPipeline>,
    pub directory: Arc<ConversationDirectory>,
}

/// Handle a parsed command
///
/// `command` is the lowercase name without prefix or bot suffix.
pub async fn handle_command(
    ctx: &CommandContext,
    message: &InboundMessage,
    command: &str,
) -> Result<()> {
    debug!("Handling command: {} from {}", command, message.sender_id);

    match command {
        "summarize" => cmd_summarize(ctx, message).await,
        "pending" => cmd_pending(ctx, message).await,
        "start" | "help" => cmd_help(ctx, message).await,
        _ => cmd_unknown(ctx, message, command).await,
    }
}

/// Conversation a command refers to, with its title.
///
/// In a group that is the group itself. In a private chat it is the group
/// the caller last posted in, or the private chat when none is known.
fn resolve_target(ctx: &CommandContext, message: &InboundMessage) -> (String, String) {
    if !message.conversation_kind.is_group()
        && let Some(group) = ctx.directory.lookup(&message.sender_id)
    {
        return (group.conversation_id, group.title);
    }
    (message.conversation_id.clone(), message.title().to_string())
}

async fn cmd_summarize(ctx: &CommandContext, message: &InboundMessage) -> Result<()> {
    let (conversation_id, title) = resolve_target(ctx, message);
    let request = SummarizeRequest::new(conversation_id, &message.sender_id, title)
        .with_reply_conversation(&message.conversation_id)
        .with_command_message(&message.id);

    let outcome = ctx.pipeline.summarize(&request).await;
    match &outcome {
        SummarizeOutcome::Delivered {
            summarized,
            requeued,
        } => info!(
            "Delivered summary of {} records from {} to {} ({} requeued)",
            summarized, request.conversation_id, request.requester_id, requeued
        ),
        other => debug!(
            "Summarize request for {} finished: {:?}",
            request.conversation_id, other
        ),
    }
    Ok(())
}

async fn cmd_pending(ctx: &CommandContext, message: &InboundMessage) -> Result<()> {
    let (conversation_id, title) = resolve_target(ctx, message);
    let count = ctx.pipeline.buffer().pending_count(&conversation_id);

    let text = match count {
        0 => format!("No new messages in {}", title),
        1 => format!("1 new message waiting in {}", title),
        n => format!("{} new messages waiting in {}", n, title),
    };
    let response =
        OutboundMessage::info(&message.conversation_id, text).with_reply_to(&message.id);
    ctx.channel.send(response).await
}

/// Send help message
async fn cmd_help(ctx: &CommandContext, message: &InboundMessage) -> Result<()> {
    let response = OutboundMessage::new(&message.conversation_id, HELP_TEXT);
    ctx.channel.send(response).await
}

async fn cmd_unknown(ctx: &CommandContext, message: &InboundMessage, command: &str) -> Result<()> {
    if message.conversation_kind.is_group() {
        debug!("Ignoring unknown command /{} in group", command);
        return Ok(());
    }

    let response = OutboundMessage::warning(
        &message.conversation_id,
        format!("Unknown command: /{}\n\nSend /help to see what I can do.", command),
    );
    ctx.channel.send(response).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MessageLevel;
    use crate::channel::mock::MockChannel;
    use crate::digest::{
        CANNOT_DELIVER_NOTICE, ConversationBuffer, LlmSummarizer, MessageRecord,
        NOTHING_TO_SUMMARIZE_NOTICE, PipelineConfig,
    };
    use chatdigest_ai::{MockLlmClient, MockStep};

    struct Fixture {
        ctx: CommandContext,
        channel: Arc<MockChannel>,
        buffer: Arc<ConversationBuffer>,
    }

    fn fixture(steps: Vec<MockStep>) -> Fixture {
        let channel = Arc::new(MockChannel::new());
        let buffer = Arc::new(ConversationBuffer::new());
        let pipeline = Arc::new(SummarizationPipeline::new(
            buffer.clone(),
            Arc::new(LlmSummarizer::new(Arc::new(MockLlmClient::from_steps(
                "mock", steps,
            )))),
            channel.clone(),
            PipelineConfig::default(),
        ));
        Fixture {
            ctx: CommandContext {
                channel: channel.clone(),
                pipeline,
                directory: Arc::new(ConversationDirectory::new()),
            },
            channel,
            buffer,
        }
    }

    fn group_command(content: &str) -> InboundMessage {
        InboundMessage::new("tg_50", "42", "-100", content)
            .with_sender_name("@alice")
            .in_group("Team")
    }

    fn private_command(content: &str) -> InboundMessage {
        InboundMessage::new("tg_51", "42", "42", content).with_sender_name("@alice")
    }

    #[tokio::test]
    async fn test_summarize_in_group() {
        let f = fixture(vec![MockStep::text("Plans for Friday")]);
        f.buffer.append("-100", MessageRecord::new("@bob", "friday?").unwrap());

        handle_command(&f.ctx, &group_command("/summarize"), "summarize")
            .await
            .unwrap();

        let private = f.channel.sent_to("42").await;
        assert_eq!(private.len(), 1);
        assert_eq!(
            private[0].content,
            "📌 Summary from chat Team\n\nPlans for Friday"
        );
        assert_eq!(
            f.channel.get_deleted_messages().await,
            vec![("-100".to_string(), "tg_50".to_string())]
        );
    }

    #[tokio::test]
    async fn test_summarize_in_private_uses_last_group() {
        let f = fixture(vec![MockStep::text("summary")]);
        f.buffer.append("-100", MessageRecord::new("@alice", "hi").unwrap());
        f.ctx.directory.record("42", "-100", "Team");

        handle_command(&f.ctx, &private_command("/summarize"), "summarize")
            .await
            .unwrap();

        assert_eq!(f.buffer.pending_count("-100"), 0);
        let sent = f.channel.sent_to("42").await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].content.starts_with("📌 Summary from chat Team"));
    }

    #[tokio::test]
    async fn test_summarize_in_private_without_group() {
        let f = fixture(vec![]);

        handle_command(&f.ctx, &private_command("/summarize"), "summarize")
            .await
            .unwrap();

        let sent = f.channel.sent_to("42").await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, NOTHING_TO_SUMMARIZE_NOTICE);
        assert_eq!(sent[0].level, MessageLevel::Info);
    }

    #[tokio::test]
    async fn test_summarize_unreachable_requester() {
        let f = fixture(vec![MockStep::text("summary")]);
        f.channel.mark_unreachable("42").await;
        f.buffer.append("-100", MessageRecord::new("@bob", "hi").unwrap());

        handle_command(&f.ctx, &group_command("/summarize"), "summarize")
            .await
            .unwrap();

        let notices = f.channel.sent_to("-100").await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].content, CANNOT_DELIVER_NOTICE);
        assert_eq!(f.buffer.pending_count("-100"), 0);
    }

    #[tokio::test]
    async fn test_pending_counts_backlog() {
        let f = fixture(vec![]);
        for text in ["a", "b", "c"] {
            f.buffer.append("-100", MessageRecord::new("@bob", text).unwrap());
        }

        handle_command(&f.ctx, &group_command("/pending"), "pending")
            .await
            .unwrap();

        let sent = f.channel.sent_to("-100").await;
        assert_eq!(sent[0].content, "3 new messages waiting in Team");
        assert_eq!(sent[0].reply_to.as_deref(), Some("tg_50"));
    }

    #[tokio::test]
    async fn test_help_and_start() {
        let f = fixture(vec![]);

        handle_command(&f.ctx, &private_command("/start"), "start")
            .await
            .unwrap();
        handle_command(&f.ctx, &group_command("/help"), "help")
            .await
            .unwrap();

        assert_eq!(f.channel.sent_to("42").await[0].content, HELP_TEXT);
        assert_eq!(f.channel.sent_to("-100").await[0].content, HELP_TEXT);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let f = fixture(vec![]);

        handle_command(&f.ctx, &group_command("/weather"), "weather")
            .await
            .unwrap();
        assert!(f.channel.get_sent_messages().await.is_empty());

        handle_command(&f.ctx, &private_command("/weather"), "weather")
            .await
            .unwrap();
        let sent = f.channel.sent_to("42").await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].content.contains("/weather"));
        assert_eq!(sent[0].level, MessageLevel::Warning);
    }
}
