//! Language-model query service for Delver.
//!
//! The exploration loop only needs one thing from a model: send a prompt,
//! get text back. This crate provides that contract as the [`QueryBackend`]
//! trait, plus an OpenAI-compatible HTTP implementation that works with
//! OpenAI, Groq, Ollama and other compatible endpoints.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  QueryBackend trait                     │
//! │  - query(prompt) -> String              │
//! └─────────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!   ┌──────────────┐    ┌─────────────┐
//!   │ OpenAiBackend│    │ MockBackend │
//!   └──────────────┘    └─────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod openai;

#[cfg(any(test, feature = "testing"))]
pub use backend::MockBackend;
pub use backend::{QueryBackend, SharedBackend, with_retry};
pub use error::{LlmError, RateLimitInfo, Result};
pub use openai::{OpenAiBackend, OpenAiConfig};
