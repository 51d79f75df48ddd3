//! Summarizer seam between the pipeline and the language model.

use async_trait::async_trait;
use chatdigest_ai::{CompletionRequest, LlmClient, Message};
use std::sync::Arc;
use tracing::debug;

use super::error::SummarizeError;

/// Instructions placed ahead of the transcript when none are configured
pub const DEFAULT_PROMPT: &str =
    "Write a structured summary of this chat. Highlight the main topics and decisions:";

/// Turns a transcript into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Summarizer backed by a chat-completion model.
///
/// Sends one user message: the instructions, a blank line, then the transcript.
pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient>,
    prompt: String,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Replace the instructions sent ahead of the transcript
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    fn build_request(&self, text: &str) -> CompletionRequest {
        CompletionRequest::new(vec![Message::user(format!("{}\n\n{}", self.prompt, text))])
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        debug!(
            provider = self.llm.provider(),
            model = self.llm.model(),
            chars = text.len(),
            "Requesting summary"
        );

        let response = self.llm.complete(self.build_request(text)).await?;
        let summary = response
            .content
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                SummarizeError::MalformedResponse("response contained no summary".to_string())
            })?;

        Ok(summary)
    }
}
