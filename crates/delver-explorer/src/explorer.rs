//! The exploration loop.
//!
//! One [`Explorer`] holds the shared collaborators (query backend and
//! capability registry) plus a configuration value. Each call to
//! [`Explorer::explore`] runs an independent session with its own
//! [`ExplorationContext`]:
//!
//! ```text
//! Planning ──▶ Round 1..N ──▶ Summarizing ──▶ Done
//!    │            │   ▲
//!    │            └───┘  query → parse → dispatch
//!    └──▶ Done (no planning response)
//! ```
//!
//! The loop never returns an error. Failures are recorded on the
//! [`ExplorationResult`] and partial history is always kept.

use std::sync::Arc;

use chrono::Utc;
use delver_llm::SharedBackend;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::capability::CapabilityRegistry;
use crate::config::ExplorationConfig;
use crate::context::ExplorationContext;
use crate::dispatch::Dispatcher;
use crate::parser::ToolCallParser;
use crate::progress::ProgressNotifier;
use crate::prompt::{Dialect, PromptView};
use crate::report::{CodeAccess, CodeExplorationReport, ReportSynthesizer};
use crate::types::{ExplorationResult, ExplorationRound, Termination, ToolCall};

/// Error recorded when the planning query yields nothing.
pub const PLANNING_FAILED_MESSAGE: &str = "Failed to get initial planning response from LLM";

/// Model text recorded for a round whose query yields nothing.
pub const ROUND_FAILED_MESSAGE: &str = "Failed to get response from LLM";

/// Summary recorded when the summary query yields nothing.
pub const SUMMARY_FAILED_MESSAGE: &str = "Failed to generate summary";

// ─────────────────────────────────────────────────────────────────────────────
// Explorer
// ─────────────────────────────────────────────────────────────────────────────

/// Runs exploration sessions against a backend and a capability registry.
///
/// Cheap to share: sessions borrow the explorer immutably and never share
/// state beyond the backend and registry.
pub struct Explorer {
    backend: SharedBackend,
    registry: Arc<CapabilityRegistry>,
    config: ExplorationConfig,
    dialect: Dialect,
    parser: ToolCallParser,
}

impl Explorer {
    /// Create an explorer with default configuration.
    pub fn new(backend: SharedBackend, registry: Arc<CapabilityRegistry>) -> Self {
        let config = ExplorationConfig::default();
        Self {
            backend,
            registry,
            dialect: Dialect::for_kind(config.dialect),
            config,
            parser: ToolCallParser::new(),
        }
    }

    /// Set the configuration. Resets the dialect to the configured kind,
    /// so call [`Self::with_dialect`] afterwards to customize it.
    pub fn with_config(mut self, config: ExplorationConfig) -> Self {
        self.dialect = Dialect::for_kind(config.dialect);
        self.config = config;
        self
    }

    /// Use a custom dialect (prompt templates and completion markers).
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run one exploration session.
    ///
    /// `cancel` is polled before each round, before each dispatch and before
    /// summarizing. `progress` receives advisory callbacks.
    pub async fn explore(
        &self,
        query: &str,
        cancel: Option<&CancellationToken>,
        progress: Option<&dyn ProgressNotifier>,
    ) -> ExplorationResult {
        let session = Session {
            explorer: self,
            result: ExplorationResult::new(Uuid::new_v4().to_string(), query),
            context: ExplorationContext::new(query)
                .with_balance(self.config.balance.clone())
                .with_coverage(self.config.coverage.clone()),
            tools: self.registry.describe(),
            cancel,
            progress,
        };
        session.run().await
    }

    /// Explore, then synthesize a report from the result.
    pub async fn explore_and_report(
        &self,
        query: &str,
        cancel: Option<&CancellationToken>,
        progress: Option<&dyn ProgressNotifier>,
        code_access: Option<&dyn CodeAccess>,
    ) -> CodeExplorationReport {
        let result = self.explore(query, cancel, progress).await;
        ReportSynthesizer::new().synthesize(&result, code_access).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// State owned by one running exploration.
struct Session<'a> {
    explorer: &'a Explorer,
    result: ExplorationResult,
    context: ExplorationContext,
    tools: String,
    cancel: Option<&'a CancellationToken>,
    progress: Option<&'a dyn ProgressNotifier>,
}

impl Session<'_> {
    async fn run(mut self) -> ExplorationResult {
        let config = &self.explorer.config;
        tracing::info!(
            session_id = %self.result.session_id,
            query = %self.result.query,
            max_tool_calls = config.max_tool_calls,
            max_rounds = config.max_rounds,
            dialect = ?self.explorer.dialect.kind(),
            tools = self.explorer.registry.len(),
            "Starting exploration"
        );

        if self.plan().await {
            self.result.termination = self.explore_rounds().await;

            if self.is_cancelled() {
                self.result.cancelled = true;
                self.result.termination = Termination::Cancelled;
            }

            if self.result.cancelled {
                tracing::info!(session_id = %self.result.session_id, "Exploration cancelled, skipping summary");
            } else {
                self.summarize().await;
            }
            self.result.success = !self.result.cancelled;
        }

        self.finish()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }

    fn view(&self) -> PromptView<'_> {
        PromptView {
            context: &self.context,
            config: &self.explorer.config,
            rounds: &self.result.rounds,
            tools: &self.tools,
        }
    }

    async fn ask(&self, prompt: &str, phase: &str) -> Option<String> {
        tracing::debug!(
            session_id = %self.result.session_id,
            phase,
            prompt_len = prompt.len(),
            "Querying model"
        );
        match self.explorer.backend.query(prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                tracing::warn!(session_id = %self.result.session_id, phase, "Model returned empty response");
                None
            }
            Err(e) => {
                tracing::warn!(session_id = %self.result.session_id, phase, error = %e, "Model query failed");
                None
            }
        }
    }

    /// Planning phase. Returns false when the session must stop.
    async fn plan(&mut self) -> bool {
        if self.is_cancelled() {
            self.result.cancelled = true;
            self.result.termination = Termination::Cancelled;
            return false;
        }

        let prompt = self.explorer.dialect.prompts().planning(&self.view());
        let Some(text) = self.ask(&prompt, "planning").await else {
            tracing::warn!(session_id = %self.result.session_id, "Planning failed");
            self.result.errors.push(PLANNING_FAILED_MESSAGE.to_string());
            self.result.termination = Termination::PlanningFailed;
            return false;
        };

        let planned = self.explorer.parser.parse(&text);
        tracing::info!(
            session_id = %self.result.session_id,
            planned = planned.len(),
            "Planning complete"
        );

        let mut round = ExplorationRound::new("Planning");
        round.model_response = Some(text);
        self.context.add_planned_tools(planned.iter().cloned());
        self.result.planned_tools = planned;
        self.complete_round(round);
        true
    }

    /// Exploring phase. Returns why it stopped.
    async fn explore_rounds(&mut self) -> Termination {
        let explorer = self.explorer;
        let config = &explorer.config;

        for number in 1..=config.max_rounds {
            if self.is_cancelled() {
                return Termination::Cancelled;
            }
            if self.context.tool_call_count() >= config.max_tool_calls {
                return Termination::CallBudget;
            }

            tracing::info!(
                session_id = %self.result.session_id,
                round = number,
                tool_calls = self.context.tool_call_count(),
                "Starting exploration round"
            );

            let mut round = ExplorationRound::new(format!("Round {}", number));
            let prompt = self.explorer.dialect.prompts().exploration(&self.view());

            let Some(text) = self.ask(&prompt, "exploration").await else {
                round.model_response = Some(ROUND_FAILED_MESSAGE.to_string());
                self.result
                    .errors
                    .push(format!("{}: {}", round.name, ROUND_FAILED_MESSAGE));
                self.complete_round(round);
                return Termination::ModelUnavailable;
            };

            let mut calls = self.explorer.parser.parse(&text);
            let mut complete = self.explorer.dialect.is_complete(&text);
            round.model_response = Some(text);

            if calls.is_empty() && !complete && config.reprompt_on_empty {
                tracing::debug!(session_id = %self.result.session_id, round = number, "No tool calls, re-prompting");
                let prompt = self.explorer.dialect.prompts().reprompt(&self.view());
                if let Some(more) = self.ask(&prompt, "reprompt").await {
                    calls = self.explorer.parser.parse(&more);
                    complete = self.explorer.dialect.is_complete(&more);
                    round.append_response(&more);
                }
            }

            let halted = self.dispatch_all(&calls, &mut round).await;
            self.complete_round(round);

            // First match wins.
            let stop = if halted || self.is_cancelled() {
                Some(Termination::Cancelled)
            } else if self.context.tool_call_count() >= config.max_tool_calls {
                Some(Termination::CallBudget)
            } else if number == config.max_rounds {
                Some(Termination::RoundBudget)
            } else if calls.is_empty() {
                Some(Termination::NoToolCalls)
            } else if complete {
                Some(Termination::Completed)
            } else {
                None
            };

            if let Some(reason) = stop {
                tracing::info!(
                    session_id = %self.result.session_id,
                    round = number,
                    reason = %reason,
                    "Exploration stopping"
                );
                return reason;
            }
        }

        Termination::RoundBudget
    }

    /// Dispatch a round's calls in emission order. Returns true when
    /// cancellation interrupted dispatching.
    async fn dispatch_all(&mut self, calls: &[ToolCall], round: &mut ExplorationRound) -> bool {
        let explorer = self.explorer;
        let config = &explorer.config;
        let dispatcher = Dispatcher::new(&explorer.registry, config.result_retention);

        for call in calls {
            if self.is_cancelled() {
                return true;
            }

            let recorded = if explorer.dialect.records_reasoning() {
                call.enriched_parameters()
            } else {
                call.parameters.clone()
            };

            if self.context.tool_call_count() >= config.max_tool_calls {
                tracing::info!(
                    session_id = %self.result.session_id,
                    tool = %call.tool,
                    "Tool call budget reached, skipping"
                );
                let skipped = Dispatcher::skipped(call, recorded);
                self.notify_execution(&skipped);
                round.executions.push(skipped);
                break;
            }

            tracing::debug!(
                session_id = %self.result.session_id,
                tool = %call.tool,
                reasoning = call.reasoning.as_deref().unwrap_or_default(),
                "Executing tool"
            );
            let execution = dispatcher.dispatch(call, recorded).await;
            self.notify_execution(&execution);
            round.executions.push(execution.clone());
            self.context.add_execution(execution);
        }
        false
    }

    /// Summarizing phase. A missing summary is recorded, never fatal.
    async fn summarize(&mut self) {
        let prompt = self.explorer.dialect.prompts().summary(&self.view());
        match self.ask(&prompt, "summary").await {
            Some(summary) => {
                tracing::info!(
                    session_id = %self.result.session_id,
                    summary_len = summary.len(),
                    "Summary generated"
                );
                self.result.summary = Some(summary);
            }
            None => {
                self.result.errors.push(SUMMARY_FAILED_MESSAGE.to_string());
                self.result.summary = Some(SUMMARY_FAILED_MESSAGE.to_string());
            }
        }
    }

    fn complete_round(&mut self, round: ExplorationRound) {
        if let Some(progress) = self.progress {
            progress.on_round_complete(&round);
        }
        self.result.rounds.push(round);
    }

    fn notify_execution(&self, execution: &crate::types::ToolExecution) {
        if let Some(progress) = self.progress {
            progress.on_tool_execution(execution);
        }
    }

    fn finish(mut self) -> ExplorationResult {
        self.result.finished_at = Utc::now();
        tracing::info!(
            session_id = %self.result.session_id,
            success = self.result.success,
            termination = %self.result.termination,
            rounds = self.result.rounds.len(),
            tool_calls = self.context.tool_call_count(),
            duration_ms = self.result.duration().num_milliseconds(),
            "Exploration finished"
        );
        if let Some(progress) = self.progress {
            progress.on_exploration_complete(&self.result);
        }
        self.result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MockCapability;
    use crate::config::DialectKind;
    use crate::dispatch::SKIPPED_MESSAGE;
    use crate::progress::{FnProgress, ProgressEvent};
    use delver_llm::MockBackend;
    use std::sync::Mutex;

    const SEARCH_BLOCK: &str = "```json\n{\"tool\":\"search_code\",\"parameters\":{\"query\":\"leaderboard scoring\"}}\n```";

    fn registry() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        registry.register(
            MockCapability::new("search_code").with_response("class LeaderboardService {...}"),
        );
        registry.register(MockCapability::new("read_file").with_response("class Score {}"));
        Arc::new(registry)
    }

    fn explorer(backend: MockBackend) -> Explorer {
        Explorer::new(Arc::new(backend), registry())
    }

    fn executed(result: &ExplorationResult) -> usize {
        result
            .executions()
            .filter(|e| e.result != SKIPPED_MESSAGE)
            .count()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let backend = MockBackend::new([
            SEARCH_BLOCK,
            "I have seen enough. Exploration complete.",
            "## Executive Summary\nScores live in LeaderboardService.",
        ]);
        let result = explorer(backend)
            .explore("How does Leaderboard scoring work?", None, None)
            .await;

        assert!(result.success);
        assert!(!result.cancelled);
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.rounds[0].name, "Planning");
        assert_eq!(result.rounds[1].name, "Round 1");
        assert!(result.rounds[1].executions.is_empty());
        assert_eq!(result.planned_tools.len(), 1);
        assert_eq!(result.planned_tools[0].tool, "search_code");
        assert!(result.summary.as_deref().unwrap().contains("LeaderboardService"));
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_planned_tools_are_not_executed() {
        let search = Arc::new(MockCapability::new("search_code").with_response("found"));
        let mut registry = CapabilityRegistry::new();
        registry.register_arc(search.clone());

        let backend = MockBackend::new([SEARCH_BLOCK, "exploration complete", "summary"]);
        let explorer = Explorer::new(Arc::new(backend), Arc::new(registry));
        let result = explorer.explore("q", None, None).await;

        assert!(result.success);
        assert_eq!(search.call_count(), 0);
        assert_eq!(result.total_executions(), 0);
    }

    #[tokio::test]
    async fn test_round_dispatches_calls_in_order() {
        let round1 = format!(
            "{}\nthen\n```json\n{{\"tool\":\"read_file\",\"parameters\":{{\"filePath\":\"src/Score.java\"}}}}\n```",
            SEARCH_BLOCK
        );
        let backend = MockBackend::new([
            "Let me plan.".to_string(),
            round1,
            "exploration complete".to_string(),
            "summary".to_string(),
        ]);
        let result = explorer(backend).explore("q", None, None).await;

        assert!(result.success);
        assert_eq!(result.rounds.len(), 3);
        let tools: Vec<_> = result.rounds[1]
            .executions
            .iter()
            .map(|e| e.tool_name.as_str())
            .collect();
        assert_eq!(tools, vec!["search_code", "read_file"]);
        assert!(result.rounds[1].executions.iter().all(|e| e.success));
        assert_eq!(result.termination, Termination::NoToolCalls);
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_abort() {
        let round1 = "```json\n{\"tool\":\"teleport\",\"parameters\":{}}\n```\n```json\n{\"tool\":\"read_file\",\"parameters\":{\"filePath\":\"a.java\"}}\n```";
        let backend = MockBackend::new(["plan", round1, "exploration complete", "summary"]);
        let result = explorer(backend).explore("q", None, None).await;

        let execs = &result.rounds[1].executions;
        assert_eq!(execs.len(), 2);
        assert!(!execs[0].success);
        assert!(execs[0].result.contains("teleport"));
        assert!(execs[1].success);
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_budget_exhausted_skip() {
        let round1 = format!(
            "{}\n```json\n{{\"tool\":\"read_file\",\"parameters\":{{\"filePath\":\"a.java\"}}}}\n```",
            SEARCH_BLOCK
        );
        let backend = MockBackend::new(["plan".to_string(), round1, "summary".to_string()]);
        let result = explorer(backend)
            .with_config(ExplorationConfig::default().with_max_tool_calls(1))
            .explore("q", None, None)
            .await;

        let execs = &result.rounds[1].executions;
        assert_eq!(execs.len(), 2);
        assert!(execs[0].success);
        assert!(!execs[1].success);
        assert_eq!(execs[1].result, SKIPPED_MESSAGE);
        assert_eq!(executed(&result), 1);
        assert_eq!(result.termination, Termination::CallBudget);
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_empty_calls_terminate_with_single_reprompt() {
        let backend = Arc::new(MockBackend::repeating("I am thinking about it."));
        let explorer = Explorer::new(backend.clone(), registry());
        let result = explorer.explore("q", None, None).await;

        // planning + round 1 + one re-prompt + summary
        assert_eq!(backend.query_count(), 4);
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.termination, Termination::NoToolCalls);
        assert!(result.success);
        assert!(
            result.rounds[1]
                .model_response
                .as_deref()
                .unwrap()
                .contains("\n\n")
        );
    }

    #[tokio::test]
    async fn test_reprompt_can_be_disabled() {
        let backend = Arc::new(MockBackend::repeating("Still thinking."));
        let explorer = Explorer::new(backend.clone(), registry())
            .with_config(ExplorationConfig::default().with_reprompt_on_empty(false));
        let result = explorer.explore("q", None, None).await;

        assert_eq!(backend.query_count(), 3);
        assert_eq!(result.termination, Termination::NoToolCalls);
    }

    #[tokio::test]
    async fn test_reprompt_calls_are_dispatched() {
        let backend = MockBackend::new(["plan", "hmm", SEARCH_BLOCK, "exploration complete", "s"]);
        let result = explorer(backend).explore("q", None, None).await;

        assert_eq!(result.rounds[1].executions.len(), 1);
        assert!(result.rounds[1].executions[0].success);
        assert_eq!(result.rounds.len(), 3);
    }

    #[tokio::test]
    async fn test_planning_failure() {
        let backend = MockBackend::scripted([None]);
        let result = explorer(backend).explore("q", None, None).await;

        assert!(!result.success);
        assert!(result.rounds.is_empty());
        assert_eq!(result.termination, Termination::PlanningFailed);
        assert_eq!(result.errors, vec![PLANNING_FAILED_MESSAGE.to_string()]);
        assert!(result.summary.is_none());
    }

    #[tokio::test]
    async fn test_round_failure_still_summarizes() {
        let backend = MockBackend::scripted([
            Some("plan".to_string()),
            None,
            Some("the summary".to_string()),
        ]);
        let result = explorer(backend).explore("q", None, None).await;

        assert!(result.success);
        assert_eq!(result.termination, Termination::ModelUnavailable);
        assert_eq!(result.rounds[1].model_response.as_deref(), Some(ROUND_FAILED_MESSAGE));
        assert_eq!(result.summary.as_deref(), Some("the summary"));
    }

    #[tokio::test]
    async fn test_summary_failure_sentinel() {
        let backend = MockBackend::scripted([
            Some("plan".to_string()),
            Some("exploration complete".to_string()),
            None,
        ]);
        let result = explorer(backend).explore("q", None, None).await;

        assert!(result.success);
        assert_eq!(result.summary.as_deref(), Some(SUMMARY_FAILED_MESSAGE));
        assert!(result.errors.contains(&SUMMARY_FAILED_MESSAGE.to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let backend = Arc::new(MockBackend::repeating(SEARCH_BLOCK));
        let explorer = Explorer::new(backend.clone(), registry());
        let result = explorer.explore("q", Some(&token), None).await;

        assert!(!result.success);
        assert!(result.cancelled);
        assert_eq!(result.termination, Termination::Cancelled);
        assert_eq!(backend.query_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_mid_round_keeps_history() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let progress = FnProgress::new(move |event| {
            if matches!(event, ProgressEvent::ToolExecuted { .. }) {
                trigger.cancel();
            }
        });

        let round1 = format!("{}\n{}", SEARCH_BLOCK, SEARCH_BLOCK);
        let backend = Arc::new(MockBackend::new(["plan".to_string(), round1]));
        let explorer = Explorer::new(backend.clone(), registry());
        let result = explorer.explore("q", Some(&token), Some(&progress)).await;

        assert!(!result.success);
        assert!(result.cancelled);
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.rounds[1].executions.len(), 1);
        assert!(result.summary.is_none());
        // planning + round 1, no summary query
        assert_eq!(backend.query_count(), 2);
    }

    #[tokio::test]
    async fn test_budget_monotonicity() {
        let many = std::iter::repeat_n(SEARCH_BLOCK, 4).collect::<Vec<_>>().join("\n");
        for (max_calls, max_rounds) in [(0, 3), (1, 1), (3, 2), (5, 5), (20, 3)] {
            let backend = MockBackend::repeating(many.clone());
            let result = explorer(backend)
                .with_config(
                    ExplorationConfig::default()
                        .with_max_tool_calls(max_calls)
                        .with_max_rounds(max_rounds),
                )
                .explore("q", None, None)
                .await;

            assert!(executed(&result) <= max_calls, "calls for {max_calls}/{max_rounds}");
            assert!(result.rounds.len() <= max_rounds + 1, "rounds for {max_calls}/{max_rounds}");
        }
    }

    #[tokio::test]
    async fn test_round_budget() {
        let backend = MockBackend::repeating(SEARCH_BLOCK);
        let result = explorer(backend)
            .with_config(ExplorationConfig::default().with_max_rounds(2))
            .explore("q", None, None)
            .await;

        assert_eq!(result.rounds.len(), 3);
        assert_eq!(result.termination, Termination::RoundBudget);
        assert_eq!(executed(&result), 2);
    }

    #[tokio::test]
    async fn test_progress_notifications() {
        let events = Mutex::new(Vec::new());
        let progress = FnProgress::new(|event| events.lock().unwrap().push(event));

        let backend = MockBackend::new(["plan", SEARCH_BLOCK, "exploration complete", "summary"]);
        explorer(backend).explore("q", None, Some(&progress)).await;

        let events = events.lock().unwrap();
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                ProgressEvent::ToolExecuted { .. } => "tool",
                ProgressEvent::RoundComplete { .. } => "round",
                ProgressEvent::ExplorationComplete { .. } => "done",
            })
            .collect();
        assert_eq!(kinds, vec!["round", "tool", "round", "round", "done"]);
    }

    #[tokio::test]
    async fn test_reasoning_dialect_records_reasoning() {
        let round1 = "```json\n{\"tool\":\"read_file\",\"parameters\":{\"filePath\":\"a.java\"},\"reasoning\":\"look\",\"deepreasoning\":\"because\"}\n```";
        let backend = MockBackend::new(["plan", round1, "EXPLORATION COMPLETE: done", "s"]);
        let read = Arc::new(MockCapability::new("read_file").with_response("x"));
        let mut registry = CapabilityRegistry::new();
        registry.register_arc(read.clone());

        let explorer = Explorer::new(Arc::new(backend), Arc::new(registry))
            .with_config(ExplorationConfig::default().with_dialect(DialectKind::Reasoning));
        let result = explorer.explore("q", None, None).await;

        let recorded = &result.rounds[1].executions[0].parameters;
        assert_eq!(recorded["reasoning"], "look");
        assert_eq!(recorded["deepreasoning"], "because");
        // The capability saw only its own parameters.
        let seen = &read.calls()[0];
        assert!(seen.get("reasoning").is_none());
        assert_eq!(seen["filePath"], "a.java");
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let explorer = Arc::new(explorer(MockBackend::repeating(SEARCH_BLOCK)).with_config(
            ExplorationConfig::default().with_max_rounds(1),
        ));
        let a = {
            let explorer = explorer.clone();
            tokio::spawn(async move { explorer.explore("first", None, None).await })
        };
        let b = {
            let explorer = explorer.clone();
            tokio::spawn(async move { explorer.explore("second", None, None).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_ne!(a.session_id, b.session_id);
        assert_eq!(executed(&a), 1);
        assert_eq!(executed(&b), 1);
    }
}
