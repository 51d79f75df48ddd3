use std::time::Duration;

use reqwest::Response;

use crate::error::AiError;

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Backoff policy for transient provider failures.
#[derive(Debug, Clone)]
pub struct LlmRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl LlmRetryConfig {
    /// A policy that sends every request exactly once
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        if let Some(seconds) = retry_after_secs {
            return Duration::from_secs(seconds).min(Duration::from_millis(self.max_delay_ms));
        }

        let multiplier = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

pub fn parse_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

pub async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let retry_after = parse_retry_after(&response);
    let body = response.text().await.unwrap_or_default();

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message: truncate_body(body),
        retry_after_secs: retry_after,
    }
}

fn truncate_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut cut = MAX_ERROR_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &body[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_progression() {
        let config = LlmRetryConfig::default();
        assert_eq!(config.delay_for(1, None), Duration::from_millis(500));
        assert_eq!(config.delay_for(2, None), Duration::from_millis(1000));
        assert_eq!(config.delay_for(3, None), Duration::from_millis(2000));
        assert_eq!(config.delay_for(4, None), Duration::from_millis(4000));
        assert_eq!(config.delay_for(5, None), Duration::from_millis(8000));
        assert_eq!(config.delay_for(6, None), Duration::from_millis(8000));
    }

    #[test]
    fn test_retry_after_overrides_backoff_but_is_capped() {
        let config = LlmRetryConfig::default();
        assert_eq!(config.delay_for(3, Some(3)), Duration::from_secs(3));
        assert_eq!(config.delay_for(1, Some(600)), Duration::from_millis(8000));
    }

    #[test]
    fn test_no_retries() {
        assert_eq!(LlmRetryConfig::no_retries().max_retries, 0);
        assert_eq!(LlmRetryConfig::default().with_max_retries(5).max_retries, 5);
    }

    #[test]
    fn test_ai_error_is_retryable() {
        let rate_limited = AiError::LlmHttp {
            provider: "Test".to_string(),
            status: 429,
            message: "rate limit".to_string(),
            retry_after_secs: None,
        };
        let server_error = AiError::LlmHttp {
            provider: "Test".to_string(),
            status: 503,
            message: "unavailable".to_string(),
            retry_after_secs: None,
        };
        let unauthorized = AiError::LlmHttp {
            provider: "Test".to_string(),
            status: 401,
            message: "unauthorized".to_string(),
            retry_after_secs: None,
        };
        assert!(rate_limited.is_retryable());
        assert!(rate_limited.is_rate_limited());
        assert!(server_error.is_retryable());
        assert!(!server_error.is_rate_limited());
        assert!(!unauthorized.is_retryable());
    }

    #[test]
    fn test_ai_error_llm_string_fallback() {
        let retryable = AiError::Llm("Rate limit exceeded".to_string());
        let non_retryable = AiError::Llm("bad request".to_string());
        assert!(retryable.is_retryable());
        assert!(!non_retryable.is_retryable());
        assert!(AiError::InvalidFormat("no choices".to_string()).is_malformed_response());
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "ж".repeat(400);
        let truncated = truncate_body(body);
        assert!(truncated.ends_with("... [truncated]"));
        assert!(truncated.len() <= MAX_ERROR_BODY + "... [truncated]".len());

        assert_eq!(truncate_body("short".to_string()), "short");
    }
}
