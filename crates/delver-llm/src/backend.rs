//! Query backend trait and shared helpers.
//!
//! This module defines the [`QueryBackend`] trait that every model provider
//! implements. The exploration loop treats a backend as a black box that turns
//! a prompt into text; retries belong here, not in the loop.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LlmError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Retry Helper
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an async operation with exponential backoff retry.
///
/// Retries only on transient errors (network failures, rate limits). A
/// provider-supplied `retry_after` takes precedence over the computed backoff.
/// Non-retryable errors are returned immediately.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    backend_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;
    let mut backoff = initial_backoff;

    for attempt in 0..=max_retries {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                let wait = e.retry_after().unwrap_or(backoff);
                last_error = Some(e);

                if attempt < max_retries {
                    tracing::warn!(
                        backend = backend_name,
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        backoff_ms = wait.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    backoff *= 2;
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| LlmError::Internal("retry loop finished without an attempt".into())))
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for language-model query services.
///
/// Implementations must be safe to share across concurrent exploration
/// sessions.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Send a prompt and return the model's text response.
    async fn query(&self, prompt: &str) -> Result<String>;

    /// Get the backend name (for logging/debugging).
    fn name(&self) -> &str;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn QueryBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend (for testing)
// ─────────────────────────────────────────────────────────────────────────────

/// A mock backend for testing purposes.
///
/// Replies are returned in order; `None` entries simulate a failed query.
/// Once the script is exhausted, the backend either repeats a fixed reply
/// (see [`MockBackend::repeating`]) or fails.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    replies: parking_lot::Mutex<std::collections::VecDeque<Option<String>>>,
    fallback: Option<String>,
    prompts: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "testing"))]
impl MockBackend {
    /// Create a mock backend that returns the given texts in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::scripted(replies.into_iter().map(|r| Some(r.into())))
    }

    /// Create a mock backend from a script where `None` means "query failed".
    pub fn scripted(replies: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            name: "mock".to_string(),
            replies: parking_lot::Mutex::new(replies.into_iter().collect()),
            fallback: None,
            prompts: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock backend that answers every prompt with the same text.
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::scripted(std::iter::empty())
        }
    }

    /// Get all prompts that were sent to this backend.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Get the number of queries made.
    pub fn query_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl QueryBackend for MockBackend {
    async fn query(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());

        match self.replies.lock().pop_front() {
            Some(Some(text)) => Ok(text),
            Some(None) => Err(LlmError::Backend("MockBackend: scripted failure".to_string())),
            None => self.fallback.clone().ok_or_else(|| {
                LlmError::Backend("MockBackend: no more responses available".to_string())
            }),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
