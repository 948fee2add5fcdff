//! CLI command handlers.

pub mod config;
pub mod explore;
pub mod report;
pub mod tools;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::ValueEnum;
use delver_config::{Backend, DialectName, ExplorationSection, LlmConfig, LoadedConfig};
use delver_explorer::{
    BalanceThresholds, CancellationToken, CapabilityRegistry, CoverageThresholds, DialectKind,
    ExplorationConfig, LocalCodeAccess, RemoteToolClient, ResultRetention, Workspace,
    local_registry,
};
use delver_llm::{OpenAiBackend, OpenAiConfig, SharedBackend};

/// Prompt dialect selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Json,
    Reasoning,
}

/// Values given on the command line, applied over the loaded config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub tool_server: Option<String>,
    pub max_tool_calls: Option<usize>,
    pub max_rounds: Option<usize>,
    pub dialect: Option<DialectArg>,
}

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged file configuration.
    pub config: LoadedConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Command-line overrides.
    pub overrides: Overrides,
}

/// Where capabilities come from for this invocation.
pub enum ToolSource {
    Local(Arc<Workspace>),
    Remote(String),
}

impl Context {
    /// Exploration settings: config file values, then CLI flags.
    pub fn exploration_config(&self) -> Result<ExplorationConfig> {
        let section = self.config.config.exploration();
        let mut config = exploration_from_section(&section)?;

        if let Some(max) = self.overrides.max_tool_calls {
            if max == 0 {
                bail!("--max-tool-calls must be at least 1");
            }
            config = config.with_max_tool_calls(max);
        }
        if let Some(max) = self.overrides.max_rounds {
            config = config.with_max_rounds(max);
        }
        if let Some(dialect) = self.overrides.dialect {
            config = config.with_dialect(match dialect {
                DialectArg::Json => DialectKind::Json,
                DialectArg::Reasoning => DialectKind::Reasoning,
            });
        }
        Ok(config)
    }

    /// Local workspace or remote server, per flags and `[tools]`.
    pub fn tool_source(&self) -> ToolSource {
        let tools = self.config.config.tools();
        if let Some(url) = self
            .overrides
            .tool_server
            .clone()
            .or(tools.server_url)
            .filter(|u| !u.trim().is_empty())
        {
            return ToolSource::Remote(url);
        }

        let root = self.overrides.root.clone().unwrap_or(tools.root);
        ToolSource::Local(Arc::new(
            Workspace::new(root)
                .with_max_file_bytes(tools.max_file_bytes as u64)
                .with_max_results(tools.max_search_results.max(1)),
        ))
    }

    /// Capability registry for the selected tool source.
    pub async fn registry(&self) -> Result<CapabilityRegistry> {
        match self.tool_source() {
            ToolSource::Local(workspace) => {
                if !workspace.root().is_dir() {
                    bail!("Project root is not a directory: {}", workspace.root().display());
                }
                Ok(local_registry(Workspace::clone(&workspace)))
            }
            ToolSource::Remote(url) => RemoteToolClient::new(url.clone())?
                .registry()
                .await
                .with_context(|| format!("Failed to load tools from {}", url)),
        }
    }

    /// Full-source lookups, available only for local workspaces.
    pub fn code_access(&self) -> Option<LocalCodeAccess> {
        match self.tool_source() {
            ToolSource::Local(workspace) => Some(LocalCodeAccess::new(workspace)),
            ToolSource::Remote(_) => None,
        }
    }

    /// Query backend from `[llm]`.
    pub fn backend(&self) -> Result<SharedBackend> {
        let llm = self.config.config.llm.clone().unwrap_or_default();
        let backend = OpenAiBackend::new(openai_config(&llm)?)
            .context("Failed to create LLM backend")?;
        Ok(Arc::new(backend))
    }
}

/// Map the `[exploration]` section onto the explorer's value object.
pub fn exploration_from_section(section: &ExplorationSection) -> Result<ExplorationConfig> {
    let retention = ResultRetention::from_limit(section.result_truncation.limit()?);
    let dialect = match section.dialect {
        DialectName::Json => DialectKind::Json,
        DialectName::Reasoning => DialectKind::Reasoning,
    };

    let mut config = ExplorationConfig::default()
        .with_max_tool_calls(section.max_tool_calls)
        .with_max_rounds(section.max_rounds)
        .with_tools_per_round(section.tools_per_round)
        .with_result_retention(retention)
        .with_dialect(dialect)
        .with_reprompt_on_empty(section.reprompt_on_empty)
        .with_balance(BalanceThresholds {
            upper: section.balance.upper_threshold,
            lower: section.balance.lower_threshold,
            min_test_files: section.balance.min_test_files,
        })
        .with_coverage(CoverageThresholds {
            short_query_words: section.coverage.short_query_words,
            short_query_min_calls: section.coverage.short_query_min_calls,
            long_query_min_calls: section.coverage.long_query_min_calls,
            min_elements: section.coverage.min_elements,
            min_files: section.coverage.min_files,
            key_finding_min_chars: section.coverage.key_finding_min_chars,
            max_key_findings: section.coverage.max_key_findings,
        });
    config.recent_executions = section.recent_executions;
    config.prompt_result_chars = section.prompt_result_chars;
    Ok(config)
}

/// Build the HTTP backend configuration for an `[llm]` section.
pub fn openai_config(llm: &LlmConfig) -> Result<OpenAiConfig> {
    let backend = llm.backend.unwrap_or(Backend::Openai);
    let api_key = llm.resolve_api_key();

    let mut config = match backend {
        Backend::Ollama => OpenAiConfig::ollama(),
        Backend::Openai | Backend::Groq => {
            let Some(key) = api_key else {
                bail!(
                    "No API key for {}. Set {} or [llm].api_key",
                    backend,
                    backend.env_var()
                );
            };
            if backend == Backend::Groq {
                OpenAiConfig::groq(key)
            } else {
                OpenAiConfig::openai(key)
            }
        }
        Backend::Custom => {
            if llm.base_url.is_none() {
                bail!("[llm].base_url is required for the custom backend");
            }
            OpenAiConfig::openai(api_key.unwrap_or_default()).with_name("custom")
        }
    };

    if let Some(ref url) = llm.base_url {
        config = config.with_base_url(url);
    }
    if let Some(ref model) = llm.model {
        config = config.with_model(model);
    }
    if let Some(temperature) = llm.temperature {
        config = config.with_temperature(temperature);
    }
    if let Some(max_tokens) = llm.max_tokens {
        config = config.with_max_tokens(max_tokens);
    }
    if let Some(secs) = llm.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(retries) = llm.retry_max {
        config = config.with_max_retries(retries);
    }
    if let Some(ms) = llm.retry_backoff_ms {
        config = config.with_retry_backoff(Duration::from_millis(ms));
    }
    Ok(config)
}

/// A token cancelled on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing with partial results");
            child.cancel();
        }
    });
    token
}
