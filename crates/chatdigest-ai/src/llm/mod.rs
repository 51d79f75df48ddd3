//! LLM module - chat completion client abstraction

mod client;
mod mock_client;
mod openai;
pub mod retry;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, TokenUsage,
};
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
pub use openai::{DEEPSEEK_BASE_URL, DEEPSEEK_DEFAULT_MODEL, OPENAI_BASE_URL, OpenAIClient};
pub use retry::LlmRetryConfig;
