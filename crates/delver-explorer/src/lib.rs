//! Autonomous code exploration for Delver.
//!
//! An [`Explorer`] answers a question about a codebase by driving a query
//! service through a bounded loop of tool calls, then condensing what it
//! found into a summary and a [`CodeExplorationReport`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Explorer                                                    │
//! │  Planning ─▶ Exploring (rounds) ─▶ Summarizing ─▶ Done       │
//! └──────────────────────────────────────────────────────────────┘
//!          │                │                  │
//!          ▼                ▼                  ▼
//!   ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ PromptSet  │   │ Dispatcher   │   │ Exploration  │
//!   │ + Parser   │   │ + Registry   │   │ Context      │
//!   └────────────┘   └──────────────┘   └──────────────┘
//!                                              │
//!                                              ▼
//!                                     ┌──────────────────┐
//!                                     │ ReportSynthesizer│
//!                                     └──────────────────┘
//! ```
//!
//! # Core Components
//!
//! - [`ToolCallParser`]: pulls tool calls out of free-form model text
//! - [`ExplorationContext`]: accumulated executions with source/test balance
//! - [`CapabilityRegistry`]: named capabilities, local or remote
//! - [`ReportSynthesizer`]: structured report from a finished exploration

pub mod capability;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod explorer;
pub mod parser;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod tools;
pub mod types;

// Re-export core types
pub use error::{ExplorerError, Result};
pub use types::{
    ExplorationResult, ExplorationRound, Parameters, Termination, ToolCall, ToolExecution,
};

// Re-export configuration
pub use config::{
    BalanceThresholds, CoverageThresholds, DialectKind, ExplorationConfig, ResultRetention,
};

// Re-export the loop
pub use explorer::Explorer;
pub use parser::ToolCallParser;
pub use context::ExplorationContext;
pub use dispatch::Dispatcher;
pub use prompt::{Dialect, JsonPrompts, PromptSet, PromptView, ReasoningPrompts};
pub use progress::{ChannelProgress, FnProgress, ProgressEvent, ProgressNotifier};

// Re-export capability types
pub use capability::{
    Capability, CapabilityOutput, CapabilityRegistry, ParamExt, ToolCategory, ToolInfo,
};
#[cfg(any(test, feature = "testing"))]
pub use capability::MockCapability;

// Re-export report types
pub use report::{CodeAccess, CodeExplorationReport, CodePiece, PieceType, ReportSynthesizer};
#[cfg(any(test, feature = "testing"))]
pub use report::MockCodeAccess;

// Re-export built-in capabilities
pub use tools::{LocalCodeAccess, RemoteToolClient, Workspace, local_registry};

// Cancellation is part of the public explore signature.
pub use tokio_util::sync::CancellationToken;
