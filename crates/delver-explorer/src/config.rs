//! Exploration configuration value object.
//!
//! Every budget and heuristic threshold the loop uses lives here, so two
//! sessions with different budgets can run side by side. The balance and
//! coverage defaults are empirical starting points and are meant to be tuned.

use serde::{Deserialize, Serialize};

/// How tool results are retained before being stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultRetention {
    /// Keep results whole.
    #[default]
    Unlimited,
    /// Cut results to this many bytes, marking the cut.
    Limited(usize),
}

impl ResultRetention {
    /// Build from an optional byte cap.
    pub fn from_limit(limit: Option<usize>) -> Self {
        limit.map_or(Self::Unlimited, Self::Limited)
    }
}

/// Prompt template and parsing dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    /// Plain JSON tool calls with phase-guided prompts.
    #[default]
    Json,
    /// Tool calls annotated with reasoning, stage-adapted prompts.
    Reasoning,
}

/// Source/test balance thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceThresholds {
    /// Ratio above which more test exploration is wanted.
    pub upper: f64,
    /// Ratio below which more source exploration is wanted.
    pub lower: f64,
    /// Explored test files needed before tests count as covered.
    pub min_test_files: usize,
}

impl Default for BalanceThresholds {
    fn default() -> Self {
        Self {
            upper: 0.75,
            lower: 0.65,
            min_test_files: 3,
        }
    }
}

/// Coverage heuristic thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageThresholds {
    /// Queries with fewer words than this are "short".
    pub short_query_words: usize,
    pub short_query_min_calls: usize,
    pub long_query_min_calls: usize,
    pub min_elements: usize,
    pub min_files: usize,
    /// A result longer than this is "substantial" and a key finding.
    pub key_finding_min_chars: usize,
    pub max_key_findings: usize,
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self {
            short_query_words: 5,
            short_query_min_calls: 5,
            long_query_min_calls: 10,
            min_elements: 5,
            min_files: 3,
            key_finding_min_chars: 100,
            max_key_findings: 10,
        }
    }
}

/// Configuration for an exploration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationConfig {
    /// Total tool-call budget.
    pub max_tool_calls: usize,
    /// Rounds after planning.
    pub max_rounds: usize,
    /// Suggested calls per round, shown to the model.
    pub tools_per_round: usize,
    pub result_retention: ResultRetention,
    /// Recent executions shown in each exploration prompt.
    pub recent_executions: usize,
    /// Characters of each recent result shown in prompts.
    pub prompt_result_chars: usize,
    pub dialect: DialectKind,
    /// Re-prompt once when a round yields no calls and no completion marker.
    pub reprompt_on_empty: bool,
    pub balance: BalanceThresholds,
    pub coverage: CoverageThresholds,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: 20,
            max_rounds: 5,
            tools_per_round: 2,
            result_retention: ResultRetention::Unlimited,
            recent_executions: 5,
            prompt_result_chars: 500,
            dialect: DialectKind::Json,
            reprompt_on_empty: true,
            balance: BalanceThresholds::default(),
            coverage: CoverageThresholds::default(),
        }
    }
}

impl ExplorationConfig {
    /// Set the tool-call budget.
    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max;
        self
    }

    /// Set the round budget.
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    /// Set the per-round hint.
    pub fn with_tools_per_round(mut self, n: usize) -> Self {
        self.tools_per_round = n;
        self
    }

    /// Set result retention.
    pub fn with_result_retention(mut self, retention: ResultRetention) -> Self {
        self.result_retention = retention;
        self
    }

    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Enable or disable the explicit re-prompt.
    pub fn with_reprompt_on_empty(mut self, enabled: bool) -> Self {
        self.reprompt_on_empty = enabled;
        self
    }

    /// Set balance thresholds.
    pub fn with_balance(mut self, balance: BalanceThresholds) -> Self {
        self.balance = balance;
        self
    }

    /// Set coverage thresholds.
    pub fn with_coverage(mut self, coverage: CoverageThresholds) -> Self {
        self.coverage = coverage;
        self
    }
}
