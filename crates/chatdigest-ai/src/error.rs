//! Error types for the AI module

use thiserror::Error;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} HTTP {status}: {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    /// Whether the provider rejected the request because of rate limiting
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::LlmHttp { status, .. } => *status == 429,
            Self::Llm(message) => message.to_lowercase().contains("rate limit"),
            _ => false,
        }
    }

    /// Whether the request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LlmHttp { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Llm(_) => self.is_rate_limited(),
            Self::InvalidFormat(_) | Self::Json(_) => false,
        }
    }

    /// Whether the response arrived but could not be understood
    pub fn is_malformed_response(&self) -> bool {
        match self {
            Self::InvalidFormat(_) | Self::Json(_) => true,
            Self::Http(e) => e.is_decode(),
            _ => false,
        }
    }

    /// Server-provided retry delay, if any
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::LlmHttp {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
