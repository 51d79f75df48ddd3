//! Message buffering and summarization.
//!
//! [`ConversationBuffer`] accumulates group messages, and
//! [`SummarizationPipeline`] turns a conversation backlog into a private
//! summary on request.

mod buffer;
mod error;
mod pipeline;
mod record;
mod summarizer;

pub use buffer::{ConversationBuffer, Drained};
pub use error::SummarizeError;
pub use pipeline::{
    CANNOT_DELIVER_NOTICE, DEFAULT_MAX_RECORDS, NOTHING_TO_SUMMARIZE_NOTICE, OverflowPolicy,
    PipelineConfig, ProcessOutcome, SummarizationPipeline, SummarizeOutcome, SummarizeRequest,
};
pub use record::{MessageRecord, render_transcript};
pub use summarizer::{DEFAULT_PROMPT, LlmSummarizer, Summarizer};
