//! Core data types for an exploration session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter map of a tool call, kept in emission order.
pub type Parameters = Map<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Tool Calls
// ─────────────────────────────────────────────────────────────────────────────

/// A structured request, parsed from model text, to invoke one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Capability name.
    pub tool: String,
    /// Capability parameters.
    pub parameters: Parameters,
    /// Short reasoning attached by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Longer reasoning attached by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_reasoning: Option<String>,
}

impl ToolCall {
    /// Create a tool call without reasoning.
    pub fn new(tool: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            tool: tool.into(),
            parameters,
            reasoning: None,
            deep_reasoning: None,
        }
    }

    /// Attach reasoning text.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Attach deep reasoning text.
    pub fn with_deep_reasoning(mut self, deep_reasoning: impl Into<String>) -> Self {
        self.deep_reasoning = Some(deep_reasoning.into());
        self
    }

    /// Parameters as a JSON object, for handing to a capability.
    pub fn parameters_value(&self) -> Value {
        Value::Object(self.parameters.clone())
    }

    /// Parameters with the reasoning fields merged in.
    ///
    /// Used for recording; capabilities always receive [`Self::parameters`].
    pub fn enriched_parameters(&self) -> Parameters {
        let mut params = self.parameters.clone();
        if let Some(ref reasoning) = self.reasoning {
            params.insert("reasoning".to_string(), Value::String(reasoning.clone()));
        }
        if let Some(ref deep) = self.deep_reasoning {
            params.insert("deepreasoning".to_string(), Value::String(deep.clone()));
        }
        params
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Executions
// ─────────────────────────────────────────────────────────────────────────────

/// The recorded outcome of dispatching one [`ToolCall`].
///
/// `result` holds the error message when `success` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool_name: String,
    pub parameters: Parameters,
    pub result: String,
    pub success: bool,
}

impl ToolExecution {
    /// A successful execution.
    pub fn success(
        tool_name: impl Into<String>,
        parameters: Parameters,
        result: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            result: result.into(),
            success: true,
        }
    }

    /// A failed execution carrying its error message.
    pub fn failure(
        tool_name: impl Into<String>,
        parameters: Parameters,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            result: error.into(),
            success: false,
        }
    }

    /// String parameter lookup.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rounds and Results
// ─────────────────────────────────────────────────────────────────────────────

/// One iteration of the loop: a model query and its dispatches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorationRound {
    pub name: String,
    pub model_response: Option<String>,
    pub executions: Vec<ToolExecution>,
}

impl ExplorationRound {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append more model text (e.g. a re-prompt reply) to this round.
    pub(crate) fn append_response(&mut self, text: &str) {
        match self.model_response {
            Some(ref mut existing) => {
                existing.push_str("\n\n");
                existing.push_str(text);
            }
            None => self.model_response = Some(text.to_string()),
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The planning query returned nothing.
    PlanningFailed,
    /// A round query returned nothing.
    ModelUnavailable,
    /// The model declared completion.
    Completed,
    /// A round produced no tool calls.
    NoToolCalls,
    /// The tool-call budget was reached.
    CallBudget,
    /// The round budget was reached.
    RoundBudget,
    /// The caller cancelled the session.
    Cancelled,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::PlanningFailed => "planning failed",
            Self::ModelUnavailable => "model unavailable",
            Self::Completed => "model declared completion",
            Self::NoToolCalls => "no tool calls",
            Self::CallBudget => "tool call budget reached",
            Self::RoundBudget => "round budget reached",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// The terminal artifact of one exploration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationResult {
    /// Session identifier (for log correlation).
    pub session_id: String,
    /// The query that started the session.
    pub query: String,
    pub rounds: Vec<ExplorationRound>,
    /// Tool calls proposed during planning (informational only).
    pub planned_tools: Vec<ToolCall>,
    pub summary: Option<String>,
    pub success: bool,
    pub cancelled: bool,
    pub termination: Termination,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExplorationResult {
    pub(crate) fn new(session_id: impl Into<String>, query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            query: query.into(),
            rounds: Vec::new(),
            planned_tools: Vec::new(),
            summary: None,
            success: false,
            cancelled: false,
            termination: Termination::RoundBudget,
            errors: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Total executions across all rounds, skipped ones included.
    pub fn total_executions(&self) -> usize {
        self.rounds.iter().map(|r| r.executions.len()).sum()
    }

    /// All executions in round order.
    pub fn executions(&self) -> impl Iterator<Item = &ToolExecution> {
        self.rounds.iter().flat_map(|r| r.executions.iter())
    }

    /// Wall-clock duration of the session.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_enriched_parameters() {
        let call = ToolCall::new("search_code", params(json!({"query": "score"})))
            .with_reasoning("find scoring")
            .with_deep_reasoning("scoring is probably in a service");

        let enriched = call.enriched_parameters();
        assert_eq!(enriched["query"], "score");
        assert_eq!(enriched["reasoning"], "find scoring");
        assert_eq!(enriched["deepreasoning"], "scoring is probably in a service");
        // Original parameters untouched.
        assert_eq!(call.parameters.len(), 1);
    }

    #[test]
    fn test_round_append_response() {
        let mut round = ExplorationRound::new("Round 1");
        round.append_response("first");
        round.append_response("second");
        assert_eq!(round.model_response.as_deref(), Some("first\n\nsecond"));
    }

    #[test]
    fn test_result_totals() {
        let mut result = ExplorationResult::new("s1", "q");
        let mut round = ExplorationRound::new("Round 1");
        round
            .executions
            .push(ToolExecution::success("read_file", Parameters::new(), "ok"));
        round
            .executions
            .push(ToolExecution::failure("x", Parameters::new(), "bad"));
        result.rounds.push(ExplorationRound::new("Planning"));
        result.rounds.push(round);

        assert_eq!(result.total_executions(), 2);
        assert_eq!(result.executions().filter(|e| e.success).count(), 1);
    }

    #[test]
    fn test_termination_serializes_snake_case() {
        let text = serde_json::to_string(&Termination::CallBudget).unwrap();
        assert_eq!(text, "\"call_budget\"");
    }
}
