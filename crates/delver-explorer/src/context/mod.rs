//! Exploration context: the accumulating state of one session.
//!
//! Every appended [`ToolExecution`] incrementally updates the derived sets:
//! explored files and elements (each split into source and test), and the
//! relationship map fed by `find_relationships` results. The loop reads
//! these back through the derived queries to steer later prompts.

mod classify;
mod extract;

pub use classify::{Scope, element_scope, has_test_markers, is_test_path, path_scope};
pub use extract::{
    ClassInfoExtractor, Element, ElementExtractor, ElementKind, PatternExtractor,
    ReadFileExtractor,
};

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{BalanceThresholds, CoverageThresholds};
use crate::types::{ToolCall, ToolExecution};

/// Cap on suggestion lists.
const MAX_SUGGESTIONS: usize = 5;

/// Mutable state of one exploration session.
pub struct ExplorationContext {
    query: String,
    executions: Vec<ToolExecution>,
    planned_tools: Vec<ToolCall>,

    explored_elements: BTreeSet<String>,
    explored_files: BTreeSet<String>,
    source_files: BTreeSet<String>,
    test_files: BTreeSet<String>,
    source_elements: BTreeSet<String>,
    test_elements: BTreeSet<String>,
    relationships: BTreeMap<String, Vec<String>>,

    extractors: Vec<Box<dyn ElementExtractor>>,
    fallback: PatternExtractor,
    balance: BalanceThresholds,
    coverage: CoverageThresholds,
}

impl ExplorationContext {
    /// Create a context with default thresholds and built-in extractors.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            executions: Vec::new(),
            planned_tools: Vec::new(),
            explored_elements: BTreeSet::new(),
            explored_files: BTreeSet::new(),
            source_files: BTreeSet::new(),
            test_files: BTreeSet::new(),
            source_elements: BTreeSet::new(),
            test_elements: BTreeSet::new(),
            relationships: BTreeMap::new(),
            extractors: vec![Box::new(ReadFileExtractor), Box::new(ClassInfoExtractor)],
            fallback: PatternExtractor,
            balance: BalanceThresholds::default(),
            coverage: CoverageThresholds::default(),
        }
    }

    pub fn with_balance(mut self, balance: BalanceThresholds) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_coverage(mut self, coverage: CoverageThresholds) -> Self {
        self.coverage = coverage;
        self
    }

    /// Add a typed extractor, consulted before the pattern fallback.
    pub fn with_extractor(mut self, extractor: impl ElementExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an execution and update derived state.
    pub fn add_execution(&mut self, execution: ToolExecution) {
        if execution.success {
            self.absorb(&execution);
        }
        self.executions.push(execution);
    }

    /// Remember tool calls the planning round proposed.
    pub fn add_planned_tools(&mut self, calls: impl IntoIterator<Item = ToolCall>) {
        self.planned_tools.extend(calls);
    }

    fn absorb(&mut self, execution: &ToolExecution) {
        let test_context = has_test_markers(&execution.result);

        let typed: Vec<Element> = self
            .extractors
            .iter()
            .flat_map(|x| x.extract(execution))
            .collect();
        let scanned = self.fallback.extract(execution);

        for element in typed.into_iter().chain(scanned) {
            match element.kind {
                ElementKind::File => {
                    let scope = path_scope(&element.id);
                    self.explored_files.insert(element.id.clone());
                    Self::classify(
                        &mut self.source_files,
                        &mut self.test_files,
                        element.id,
                        scope,
                    );
                }
                ElementKind::Class | ElementKind::Method => {
                    let scope = element_scope(&element.id, test_context);
                    self.explored_elements.insert(element.id.clone());
                    Self::classify(
                        &mut self.source_elements,
                        &mut self.test_elements,
                        element.id,
                        scope,
                    );
                }
            }
        }

        if execution.tool_name == "find_relationships"
            && let Some(element_id) = execution.param_str("elementId")
        {
            let related = self.relationships.entry(element_id.to_string()).or_default();
            for line in execution.result.lines() {
                let trimmed = line.trim();
                if let Some(item) = trimmed.strip_prefix("- ")
                    && !line.contains("None found")
                {
                    let item = item.trim().to_string();
                    if !item.is_empty() && !related.contains(&item) {
                        related.push(item);
                    }
                }
            }
        }
    }

    /// Keep the source/test partition disjoint; test classification wins.
    fn classify(
        source: &mut BTreeSet<String>,
        test: &mut BTreeSet<String>,
        id: String,
        scope: Scope,
    ) {
        match scope {
            Scope::Test => {
                source.remove(&id);
                test.insert(id);
            }
            Scope::Source => {
                if !test.contains(&id) {
                    source.insert(id);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Derived Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of executions appended (budget-skipped calls are never appended).
    pub fn tool_call_count(&self) -> usize {
        self.executions.len()
    }

    pub fn executions(&self) -> &[ToolExecution] {
        &self.executions
    }

    pub fn planned_tools(&self) -> &[ToolCall] {
        &self.planned_tools
    }

    /// The last `n` executions, oldest first.
    pub fn recent_executions(&self, n: usize) -> &[ToolExecution] {
        let start = self.executions.len().saturating_sub(n);
        &self.executions[start..]
    }

    pub fn explored_elements(&self) -> &BTreeSet<String> {
        &self.explored_elements
    }

    pub fn explored_files(&self) -> &BTreeSet<String> {
        &self.explored_files
    }

    pub fn source_files(&self) -> &BTreeSet<String> {
        &self.source_files
    }

    pub fn test_files(&self) -> &BTreeSet<String> {
        &self.test_files
    }

    pub fn source_elements(&self) -> &BTreeSet<String> {
        &self.source_elements
    }

    pub fn test_elements(&self) -> &BTreeSet<String> {
        &self.test_elements
    }

    pub fn relationships(&self) -> &BTreeMap<String, Vec<String>> {
        &self.relationships
    }

    /// Share of explored source items among all classified items.
    ///
    /// 0.0 when nothing is explored; 1.0 when only source is explored.
    pub fn source_to_test_ratio(&self) -> f64 {
        let source = self.source_files.len() + self.source_elements.len();
        let test = self.test_files.len() + self.test_elements.len();

        if test == 0 {
            return if source > 0 { 1.0 } else { 0.0 };
        }
        source as f64 / (source + test) as f64
    }

    pub fn needs_more_test_exploration(&self) -> bool {
        self.source_to_test_ratio() > self.balance.upper
            && self.test_files.len() < self.balance.min_test_files
    }

    pub fn needs_more_source_exploration(&self) -> bool {
        self.source_to_test_ratio() < self.balance.lower
    }

    /// One-line balance summary.
    pub fn exploration_stats(&self) -> String {
        format!(
            "Source files: {}, Test files: {}, Source elements: {}, Test elements: {} ({:.0}% source)",
            self.source_files.len(),
            self.test_files.len(),
            self.source_elements.len(),
            self.test_elements.len(),
            self.source_to_test_ratio() * 100.0
        )
    }

    /// Call counts per tool, sorted by tool name.
    pub fn tool_usage_stats(&self) -> BTreeMap<String, usize> {
        let mut stats = BTreeMap::new();
        for execution in &self.executions {
            *stats.entry(execution.tool_name.clone()).or_insert(0) += 1;
        }
        stats
    }

    /// Successful executions with substantial results.
    pub fn key_findings(&self) -> Vec<&ToolExecution> {
        self.executions
            .iter()
            .filter(|e| e.success && e.result.len() > self.coverage.key_finding_min_chars)
            .take(self.coverage.max_key_findings)
            .collect()
    }

    /// Discovered elements not yet read or described directly.
    pub fn unexplored_elements(&self) -> Vec<String> {
        let read_paths: Vec<&str> = self
            .executions
            .iter()
            .filter(|e| e.success && e.tool_name == "read_file")
            .filter_map(|e| e.param_str("filePath"))
            .collect();
        let described: Vec<&str> = self
            .executions
            .iter()
            .filter(|e| e.success && e.tool_name == "get_class_info")
            .filter_map(|e| e.param_str("className"))
            .collect();

        self.explored_elements
            .iter()
            .filter(|element| {
                let as_path = element.replace('.', "/");
                !read_paths.iter().any(|p| p.contains(&as_path))
                    && !described.contains(&element.as_str())
            })
            .cloned()
            .collect()
    }

    /// Related but unexplored identifiers, de-duplicated, order-stable.
    pub fn suggested_next_elements(&self) -> Vec<String> {
        let mut suggestions: Vec<String> = Vec::new();
        for related in self.relationships.values().flatten() {
            if !self.explored_elements.contains(related) && !suggestions.contains(related) {
                suggestions.push(related.clone());
                if suggestions.len() == MAX_SUGGESTIONS {
                    break;
                }
            }
        }
        suggestions
    }

    /// Candidate test files for explored source files and elements.
    pub fn suggested_test_files(&self) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();

        for source in &self.source_files {
            let (base, ext) = split_extension(source);
            for suffix in ["Test", "Tests", "Spec"] {
                candidates.push(format!("{}{}{}", base, suffix, ext));
            }

            let mirrored = source
                .replace("/src/main/", "/src/test/")
                .replace("\\src\\main\\", "\\src\\test\\");
            if mirrored != *source {
                candidates.push(mirrored);
            }
        }

        for element in &self.source_elements {
            if element.contains("Test") || !element.contains('.') {
                continue;
            }
            let simple = element.rsplit('.').next().unwrap_or(element);
            for suffix in ["Test", "Tests", "Spec"] {
                candidates.push(format!("{}{}", simple, suffix));
            }
        }

        let mut seen = BTreeSet::new();
        candidates
            .into_iter()
            .filter(|c| !self.test_files.contains(c) && seen.insert(c.clone()))
            .take(MAX_SUGGESTIONS)
            .collect()
    }

    /// Whether enough has been explored for this query.
    pub fn has_adequate_coverage(&self) -> bool {
        let c = &self.coverage;
        let words = self.query.split_whitespace().count();

        if words < c.short_query_words {
            return self.tool_call_count() >= c.short_query_min_calls
                && !self.key_findings().is_empty();
        }

        self.tool_call_count() >= c.long_query_min_calls
            || (self.explored_elements.len() >= c.min_elements
                && self.explored_files.len() >= c.min_files)
    }
}

impl std::fmt::Debug for ExplorationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationContext")
            .field("query", &self.query)
            .field("executions", &self.executions.len())
            .field("explored_elements", &self.explored_elements.len())
            .field("explored_files", &self.explored_files.len())
            .finish_non_exhaustive()
    }
}

/// Split a path's file extension off, keeping the dot with the extension.
fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(0) | None => (path, ""),
        Some(i) => path.split_at(name_start + i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exec(tool: &str, params: serde_json::Value, result: &str) -> ToolExecution {
        ToolExecution::success(tool, params.as_object().cloned().unwrap(), result)
    }

    #[test]
    fn test_empty_ratio() {
        let ctx = ExplorationContext::new("q");
        assert_eq!(ctx.source_to_test_ratio(), 0.0);
        assert!(!ctx.needs_more_test_exploration());
        assert!(ctx.needs_more_source_exploration());
    }

    #[test]
    fn test_source_only_ratio() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(exec(
            "read_file",
            json!({"filePath": "src/main/java/com/game/Leaderboard.java"}),
            "package com.game; uses com.game.ScoreService",
        ));
        assert_eq!(ctx.source_to_test_ratio(), 1.0);
        assert!(ctx.needs_more_test_exploration());
        assert_eq!(ctx.source_files().len(), 1);
        assert!(ctx.source_elements().contains("com.game.ScoreService"));
    }

    #[test]
    fn test_ratio_mixed_and_bounded() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(exec("read_file", json!({"filePath": "src/A.java"}), "plain"));
        ctx.add_execution(exec("read_file", json!({"filePath": "src/test/ATest.java"}), "plain"));
        let ratio = ctx.source_to_test_ratio();
        assert!((0.0..=1.0).contains(&ratio));
        assert_eq!(ratio, 0.5);
        assert!(ctx.needs_more_source_exploration());
        assert_eq!(
            ctx.exploration_stats(),
            "Source files: 1, Test files: 1, Source elements: 0, Test elements: 0 (50% source)"
        );
    }

    #[test]
    fn test_partitions_stay_disjoint() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(exec("search_code", json!({}), "com.game.Leaderboard"));
        assert!(ctx.source_elements().contains("com.game.Leaderboard"));

        ctx.add_execution(exec("search_code", json!({}), "@Test uses com.game.Leaderboard"));
        assert!(ctx.test_elements().contains("com.game.Leaderboard"));
        assert!(ctx.source_elements().is_disjoint(ctx.test_elements()));

        // Later source sighting does not move it back.
        ctx.add_execution(exec("search_code", json!({}), "com.game.Leaderboard"));
        assert!(!ctx.source_elements().contains("com.game.Leaderboard"));
    }

    #[test]
    fn test_failed_executions_not_absorbed() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(ToolExecution::failure(
            "read_file",
            json!({"filePath": "src/A.java"}).as_object().cloned().unwrap(),
            "com.x.Missing not found",
        ));
        assert_eq!(ctx.tool_call_count(), 1);
        assert!(ctx.explored_files().is_empty());
        assert!(ctx.explored_elements().is_empty());
    }

    #[test]
    fn test_relationships_and_suggestions() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(exec(
            "find_relationships",
            json!({"elementId": "com.game.Leaderboard"}),
            "Relationships:\n- com.game.ScoreService\n- com.game.Player\n- None found\n- com.game.ScoreService\n",
        ));

        let related = &ctx.relationships()["com.game.Leaderboard"];
        assert_eq!(related, &vec!["com.game.ScoreService", "com.game.Player"]);

        // Both related names were also scanned from the text, so they count as explored.
        assert!(ctx.suggested_next_elements().is_empty());

        ctx.add_execution(exec(
            "find_relationships",
            json!({"elementId": "Player"}),
            "- Team\n- Team\n- Match",
        ));
        assert_eq!(ctx.suggested_next_elements(), vec!["Team", "Match"]);
    }

    #[test]
    fn test_suggested_test_files() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(exec(
            "read_file",
            json!({"filePath": "/p/src/main/java/Leaderboard.java"}),
            "plain",
        ));
        ctx.add_execution(exec(
            "read_file",
            json!({"filePath": "/p/src/main/java/LeaderboardTest.java"}),
            "plain",
        ));

        let suggestions = ctx.suggested_test_files();
        assert_eq!(
            suggestions,
            vec![
                "/p/src/main/java/LeaderboardTests.java",
                "/p/src/main/java/LeaderboardSpec.java",
                "/p/src/test/java/Leaderboard.java",
            ]
        );
    }

    #[test]
    fn test_unexplored_elements() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(exec(
            "search_code",
            json!({}),
            "com.game.Leaderboard com.game.Player com.game.Team",
        ));
        ctx.add_execution(exec(
            "read_file",
            json!({"filePath": "src/main/java/com/game/Leaderboard.java"}),
            "plain",
        ));
        ctx.add_execution(exec("get_class_info", json!({"className": "com.game.Team"}), "plain"));

        assert_eq!(ctx.unexplored_elements(), vec!["com.game.Player"]);
    }

    #[test]
    fn test_adequate_coverage_short_query() {
        let mut ctx = ExplorationContext::new("How does scoring work?");
        for _ in 0..4 {
            ctx.add_execution(exec("search_code", json!({}), "short"));
        }
        assert!(!ctx.has_adequate_coverage());

        ctx.add_execution(exec("search_code", json!({}), &"x".repeat(150)));
        assert!(ctx.has_adequate_coverage());
    }

    #[test]
    fn test_adequate_coverage_long_query() {
        let mut ctx = ExplorationContext::new(
            "How does the leaderboard compute and persist player scores across matches?",
        );
        for i in 0..3 {
            ctx.add_execution(exec(
                "read_file",
                json!({"filePath": format!("src/F{}.java", i)}),
                "com.a.One com.a.Two com.a.Three com.a.Four com.a.Five",
            ));
        }
        assert!(ctx.has_adequate_coverage());

        let thin = ExplorationContext::new(
            "How does the leaderboard compute and persist player scores across matches?",
        );
        assert!(!thin.has_adequate_coverage());
    }

    #[test]
    fn test_recent_and_usage() {
        let mut ctx = ExplorationContext::new("q");
        for tool in ["b", "a", "b", "c"] {
            ctx.add_execution(exec(tool, json!({}), "r"));
        }
        let recent: Vec<_> = ctx
            .recent_executions(2)
            .iter()
            .map(|e| e.tool_name.as_str())
            .collect();
        assert_eq!(recent, vec!["b", "c"]);
        assert_eq!(ctx.recent_executions(10).len(), 4);

        let usage: Vec<_> = ctx.tool_usage_stats().into_iter().collect();
        assert_eq!(
            usage,
            vec![("a".to_string(), 1), ("b".to_string(), 2), ("c".to_string(), 1)]
        );
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a/b/C.java"), ("a/b/C", ".java"));
        assert_eq!(split_extension("a.b/Makefile"), ("a.b/Makefile", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }
}
