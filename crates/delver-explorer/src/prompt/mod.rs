//! Prompt dialects.
//!
//! A [`Dialect`] bundles a [`PromptSet`] (how each phase's prompt is built)
//! with the completion markers that end a session. The loop is the same for
//! every dialect; only the text differs.

mod json;
mod reasoning;

pub use json::JsonPrompts;
pub use reasoning::ReasoningPrompts;

use std::sync::Arc;

use crate::config::{DialectKind, ExplorationConfig};
use crate::context::ExplorationContext;
use crate::types::{ExplorationRound, Parameters};

/// Phrases that mean "exploration is done", matched case-insensitively.
pub const DEFAULT_COMPLETION_MARKERS: &[&str] = &[
    "exploration complete",
    "finished exploring",
    "summary:",
    "## executive summary",
    "## key findings",
];

/// Everything a prompt may draw on.
#[derive(Debug, Clone, Copy)]
pub struct PromptView<'a> {
    pub context: &'a ExplorationContext,
    pub config: &'a ExplorationConfig,
    /// Rounds completed so far, planning included.
    pub rounds: &'a [ExplorationRound],
    /// Prompt-ready tool descriptions.
    pub tools: &'a str,
}

impl PromptView<'_> {
    pub fn query(&self) -> &str {
        self.context.query()
    }
}

/// Builds the prompt for each phase of the loop.
pub trait PromptSet: Send + Sync {
    fn planning(&self, view: &PromptView<'_>) -> String;

    fn exploration(&self, view: &PromptView<'_>) -> String;

    fn summary(&self, view: &PromptView<'_>) -> String;

    /// Follow-up sent once when a round yields no calls.
    fn reprompt(&self, view: &PromptView<'_>) -> String {
        format!(
            "You haven't generated any tool calls. Please generate specific tool calls to explore the code.\n\n\
             Original query: {}\n\
             Tool calls so far: {}/{}\n\n\
             Available tools:\n{}\n\n\
             Generate 1-3 tool calls in JSON format to continue the exploration.\n",
            view.query(),
            view.context.tool_call_count(),
            view.config.max_tool_calls,
            view.tools
        )
    }
}

/// Prompt templates plus completion markers.
#[derive(Clone)]
pub struct Dialect {
    kind: DialectKind,
    prompts: Arc<dyn PromptSet>,
    markers: Vec<String>,
}

impl Dialect {
    /// The built-in dialect for `kind`.
    pub fn for_kind(kind: DialectKind) -> Self {
        let prompts: Arc<dyn PromptSet> = match kind {
            DialectKind::Json => Arc::new(JsonPrompts),
            DialectKind::Reasoning => Arc::new(ReasoningPrompts),
        };
        Self {
            kind,
            prompts,
            markers: DEFAULT_COMPLETION_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }

    /// Swap in custom prompt templates.
    pub fn with_prompts(mut self, prompts: Arc<dyn PromptSet>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replace the completion markers.
    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers = markers.into_iter().map(|m| m.into().to_lowercase()).collect();
        self
    }

    pub fn kind(&self) -> DialectKind {
        self.kind
    }

    pub fn prompts(&self) -> &dyn PromptSet {
        self.prompts.as_ref()
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Whether `text` declares the exploration finished.
    pub fn is_complete(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.markers.iter().any(|m| lower.contains(m.as_str()))
    }

    /// Whether recorded executions carry the call's reasoning fields.
    pub fn records_reasoning(&self) -> bool {
        self.kind == DialectKind::Reasoning
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::for_kind(DialectKind::default())
    }
}

impl std::fmt::Debug for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialect")
            .field("kind", &self.kind)
            .field("markers", &self.markers)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared formatting helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Cut to `max` characters, appending "..." when cut.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Compact JSON rendering of a parameter map.
pub(crate) fn format_params(params: &Parameters) -> String {
    serde_json::to_string(params).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_markers() {
        let dialect = Dialect::for_kind(DialectKind::Json);
        assert!(dialect.is_complete("I think the Exploration Complete now."));
        assert!(dialect.is_complete("EXPLORATION COMPLETE: the scoring lives in ..."));
        assert!(dialect.is_complete("## Executive Summary\nScores are..."));
        assert!(!dialect.is_complete("Let me look at the service next."));
    }

    #[test]
    fn test_custom_markers() {
        let dialect = Dialect::for_kind(DialectKind::Reasoning).with_markers(["DONE."]);
        assert!(dialect.is_complete("all done."));
        assert!(!dialect.is_complete("exploration complete"));
        assert!(dialect.records_reasoning());
        assert!(!Dialect::default().records_reasoning());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello world", 5), "hello...");
        assert_eq!(truncate("héllo", 2), "hé...");
    }

    #[test]
    fn test_format_params() {
        let params = json!({"b": 1, "a": "x"}).as_object().cloned().unwrap();
        assert_eq!(format_params(&params), r#"{"b":1,"a":"x"}"#);
    }
}
