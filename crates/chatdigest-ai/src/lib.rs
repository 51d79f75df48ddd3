//! ChatDigest AI - language model access for the digest pipeline
//!
//! This crate provides:
//! - The `LlmClient` trait used to request chat completions
//! - An OpenAI-compatible HTTP client (OpenAI, DeepSeek and compatible gateways)
//! - Retry/backoff policy for transient provider failures
//! - A scripted mock client for tests

pub mod error;
pub mod llm;

pub use error::{AiError, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, LlmClient, LlmRetryConfig, Message, MockLlmClient,
    MockStep, OpenAIClient, Role,
};
