//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [llm]                      # query service backend
//! [exploration]              # budgets and prompt shaping
//! [exploration.balance]      # source/test balance thresholds
//! [exploration.coverage]     # coverage heuristic thresholds
//! [tools]                    # local or remote capabilities
//! [logging]                  # console and file logging
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelverConfig {
    /// Query service configuration.
    pub llm: Option<LlmConfig>,

    /// Exploration loop configuration.
    pub exploration: Option<ExplorationSection>,

    /// Capability configuration.
    pub tools: Option<ToolsConfig>,

    /// Logging configuration.
    pub logging: Option<LoggingConfig>,
}

impl DelverConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not merged field by field.
    pub fn merge(&mut self, other: DelverConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }

        if other.exploration.is_some() {
            self.exploration = other.exploration;
        }

        if other.tools.is_some() {
            self.tools = other.tools;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Exploration section, or defaults when absent.
    pub fn exploration(&self) -> ExplorationSection {
        self.exploration.clone().unwrap_or_default()
    }

    /// Tools section, or defaults when absent.
    pub fn tools(&self) -> ToolsConfig {
        self.tools.clone().unwrap_or_default()
    }

    /// Logging section, or defaults when absent.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref exploration) = self.exploration {
            exploration.validate()?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the query service backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider.
    pub backend: Option<Backend>,
    /// Model identifier.
    pub model: Option<String>,
    /// Custom API base URL (for proxies, custom endpoints).
    pub base_url: Option<String>,
    /// API key (prefer env var; warns if set here).
    pub api_key: Option<String>,
    /// Maximum retry attempts for failed requests.
    pub retry_max: Option<u32>,
    /// Backoff delay between retries in milliseconds.
    pub retry_backoff_ms: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens per response.
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Get the environment variable name for this backend's API key.
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.env_var())
    }

    /// Resolve the API key: config value first, then the backend's env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key
            && !key.is_empty()
        {
            return Some(key.clone());
        }

        self.api_key_env_var()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Supported query service providers (all OpenAI-compatible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Openai,
    Groq,
    Ollama,
    Custom,
}

impl Backend {
    /// Environment variable name for this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Backend::Openai => "OPENAI_API_KEY",
            Backend::Groq => "GROQ_API_KEY",
            Backend::Ollama => "OLLAMA_API_KEY",
            Backend::Custom => "LLM_API_KEY",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Openai => "OpenAI",
            Backend::Groq => "Groq",
            Backend::Ollama => "Ollama",
            Backend::Custom => "Custom",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Exploration Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Exploration loop configuration.
///
/// ```toml
/// [exploration]
/// max_tool_calls = 20
/// max_rounds = 5
/// tools_per_round = 2
/// result_truncation = "unlimited"   # or a byte count, e.g. 4000
/// dialect = "json"                  # or "reasoning"
///
/// [exploration.balance]
/// upper_threshold = 0.75
/// lower_threshold = 0.65
/// min_test_files = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationSection {
    /// Total tool-call budget for one exploration.
    pub max_tool_calls: usize,
    /// Number of exploration rounds after planning.
    pub max_rounds: usize,
    /// Preferred number of calls per round (a prompt hint, not a cap).
    pub tools_per_round: usize,
    /// Cap applied to each tool result before storing it.
    pub result_truncation: ResultTruncation,
    /// How many recent executions the prompt shows.
    pub recent_executions: usize,
    /// Characters of each recent result shown in the prompt.
    pub prompt_result_chars: usize,
    /// Prompt and parsing dialect.
    pub dialect: DialectName,
    /// Re-prompt once when a reasoning reply contains no tool calls.
    pub reprompt_on_empty: bool,
    /// Source/test balance thresholds.
    pub balance: BalanceSection,
    /// Coverage heuristic thresholds.
    pub coverage: CoverageSection,
}

impl Default for ExplorationSection {
    fn default() -> Self {
        Self {
            max_tool_calls: 20,
            max_rounds: 5,
            tools_per_round: 2,
            result_truncation: ResultTruncation::default(),
            recent_executions: 5,
            prompt_result_chars: 500,
            dialect: DialectName::default(),
            reprompt_on_empty: true,
            balance: BalanceSection::default(),
            coverage: CoverageSection::default(),
        }
    }
}

impl ExplorationSection {
    /// Validate ranges that serde accepts but the loop cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.max_tool_calls == 0 {
            return Err(ConfigError::invalid(
                "exploration.max_tool_calls",
                "must be at least 1",
            ));
        }
        if self.tools_per_round == 0 {
            return Err(ConfigError::invalid(
                "exploration.tools_per_round",
                "must be at least 1",
            ));
        }
        self.result_truncation.limit()?;

        let b = &self.balance;
        for (field, value) in [
            ("exploration.balance.upper_threshold", b.upper_threshold),
            ("exploration.balance.lower_threshold", b.lower_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, "must be between 0.0 and 1.0"));
            }
        }
        if b.lower_threshold > b.upper_threshold {
            return Err(ConfigError::invalid(
                "exploration.balance.lower_threshold",
                "must not exceed upper_threshold",
            ));
        }
        Ok(())
    }
}

/// Per-result truncation setting: a byte count or the keyword `"unlimited"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultTruncation {
    Bytes(usize),
    Keyword(String),
}

impl Default for ResultTruncation {
    fn default() -> Self {
        Self::Keyword("unlimited".to_string())
    }
}

impl ResultTruncation {
    /// Resolve to an optional byte cap (`None` = keep everything).
    pub fn limit(&self) -> Result<Option<usize>> {
        match self {
            Self::Bytes(0) => Err(ConfigError::invalid(
                "exploration.result_truncation",
                "byte cap must be greater than zero",
            )),
            Self::Bytes(n) => Ok(Some(*n)),
            Self::Keyword(k) if k.eq_ignore_ascii_case("unlimited") => Ok(None),
            Self::Keyword(k) => Err(ConfigError::invalid(
                "exploration.result_truncation",
                format!("expected a byte count or \"unlimited\", got \"{}\"", k),
            )),
        }
    }
}

/// Prompt/parsing dialect name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectName {
    #[default]
    Json,
    Reasoning,
}

/// Source/test balance thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSection {
    /// Source ratio above which the loop pushes toward tests.
    pub upper_threshold: f64,
    /// Source ratio below which the loop pushes toward source.
    pub lower_threshold: f64,
    /// Minimum test files explored before test coverage counts as adequate.
    pub min_test_files: usize,
}

impl Default for BalanceSection {
    fn default() -> Self {
        Self {
            upper_threshold: 0.75,
            lower_threshold: 0.65,
            min_test_files: 3,
        }
    }
}

/// Coverage heuristic thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageSection {
    /// Queries with at most this many words count as short.
    pub short_query_words: usize,
    /// Minimum tool calls for a short query.
    pub short_query_min_calls: usize,
    /// Minimum tool calls for a longer query.
    pub long_query_min_calls: usize,
    /// Minimum explored elements.
    pub min_elements: usize,
    /// Minimum explored files.
    pub min_files: usize,
    /// Results longer than this count as key findings.
    pub key_finding_min_chars: usize,
    /// Maximum key findings collected.
    pub max_key_findings: usize,
}

impl Default for CoverageSection {
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

// ─────────────────────────────────────────────────────────────────────────────
// Tools Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Capability configuration.
///
/// ```toml
/// [tools]
/// root = "."
/// server_url = "http://localhost:8765"   # optional; replaces local tools
/// max_file_bytes = 512000
/// max_search_results = 50
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Root directory for local capabilities.
    pub root: PathBuf,
    /// Remote tool server base URL.
    pub server_url: Option<String>,
    /// Maximum bytes read_file returns.
    pub max_file_bytes: usize,
    /// Maximum matches returned by search capabilities.
    pub max_search_results: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            server_url: None,
            max_file_bytes: 500 * 1024,
            max_search_results: 50,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console filter directive (overrides the built-in default).
    pub console_filter: Option<String>,
    /// Whether the JSON file log is written.
    pub file: bool,
    /// Directory for log files (defaults to `<config dir>/logs`).
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_filter: None,
            file: true,
            dir: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
