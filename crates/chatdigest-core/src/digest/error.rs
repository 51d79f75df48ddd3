//! Summarizer failure kinds.

use chatdigest_ai::AiError;
use thiserror::Error;

/// Why a summarizer call produced no summary.
///
/// The pipeline handles every kind the same way: the drained backlog is
/// restored and the failure is reported in the conversation.
#[derive(Error, Debug)]
pub enum SummarizeError {
    /// Connection failure, timeout or unexpected HTTP status
    #[error("transport error: {0}")]
    Transport(String),

    /// The service refused the request because of rate limiting
    #[error("rate limited{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// The service answered but the answer held no usable summary
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(" (retry after {}s)", secs))
        .unwrap_or_default()
}

impl From<AiError> for SummarizeError {
    fn from(error: AiError) -> Self {
        if error.is_rate_limited() {
            Self::RateLimited {
                retry_after_secs: error.retry_after(),
            }
        } else if error.is_malformed_response() {
            Self::MalformedResponse(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}
