//! Error types for the explorer crate.

use thiserror::Error;

/// Result type alias using the explorer error type.
pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Error type for explorer operations.
///
/// These never escape [`Explorer::explore`](crate::Explorer::explore); the loop
/// turns them into failed executions or result errors.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Query service error.
    #[error("LLM error: {0}")]
    Llm(#[from] delver_llm::LlmError),

    /// Capability execution error.
    #[error("Capability error: {0}")]
    Capability(String),

    /// Capability not found in registry.
    #[error("Unknown tool '{0}'")]
    CapabilityNotFound(String),

    /// Invalid capability parameters.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExplorerError {
    /// Create a capability error.
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Create an invalid-parameters error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
