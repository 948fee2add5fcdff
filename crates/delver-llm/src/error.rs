//! Errors raised while querying a language model.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

/// A 429 response, with the provider's requested wait when it sent one.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_header(message, None)
    }

    /// Build from a `Retry-After` value in seconds. Fractions are honoured;
    /// HTTP-date values and garbage are ignored.
    pub fn from_header(message: impl Into<String>, retry_after: Option<&str>) -> Self {
        let retry_after = retry_after
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64);
        Self {
            message: message.into(),
            retry_after,
        }
    }
}

impl std::fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.retry_after {
            Some(wait) => write!(
                f,
                "{} (retry after {:.2}s)",
                self.message,
                wait.as_secs_f64()
            ),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered with an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Timeouts and connection failures.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The provider rejected the request as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(RateLimitInfo),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit(RateLimitInfo::new(message))
    }

    /// Provider-requested wait, for rate limits only.
    pub fn retry_after(&self) -> Option<Duration> {
        if let Self::RateLimit(info) = self {
            info.retry_after
        } else {
            None
        }
    }

    /// Network failures and rate limits are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "Request timed out: "
        } else if err.is_connect() {
            "Connection failed: "
        } else {
            ""
        };
        LlmError::Network(format!("{}{}", kind, err))
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}
