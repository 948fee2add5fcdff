//! The JSON dialect: phase-guided prompts with source/test steering.

use super::{PromptSet, PromptView, format_params, truncate};

/// Characters of each key finding shown in the summary prompt.
const SUMMARY_FINDING_CHARS: usize = 300;

const PLANNING_GUIDE: &str = r#"## EXPLORATION STRATEGY

### 1. Tool order

**Phase 1 - Discovery (start here):**
- `search_code` for conceptual queries ("authentication logic", "payment processing")
- `find_by_name` for specific names ("UserService", "calculateTotal")

**Phase 2 - Context:**
- `list_files_in_directory` to explore package structure
- `get_current_context` / `get_project_structure` when available

**Phase 3 - Deep analysis:**
- `read_file` to examine implementations
- `get_class_info` / `find_methods` for structure

**Phase 4 - Relationships:**
- `find_relationships`, `find_callers`, `find_implementations`, `find_usages`

### 2. Source vs test balance

Keep roughly 70% source / 30% test exploration. Tests document expected
behavior: when you find `UserService`, also look for `UserServiceTest`.
Test files usually end with `Test`, `Tests` or `Spec`, or live under `/test/`
or `/tests/`.

### 3. Practices

- Be specific with search queries ("user authentication validation logic", not "validation").
- `find_by_name` is case-sensitive.
- Start broad, then narrow. Find an element before exploring its relationships.

Format each tool call as a JSON block:
```json
{
  "tool": "tool_name",
  "parameters": {"param1": "value1"},
  "reasoning": "Why this call helps answer the query"
}
```
"#;

const EXPLORATION_TIPS: &str = r#"## EXPLORATION TIPS
1. Keep about 70% source and 30% test exploration.
2. Tests show expected behavior and usage.
3. When you find a class, explore its methods and its tests.
4. For inheritance check parents and children; for calls check callers and callees.
5. Do not repeat a tool call with the same parameters.
6. Prioritize code that directly relates to the original query.
"#;

const SUMMARY_GUIDE: &str = r#"
## SUMMARY GUIDELINES

Answer the original query directly. Be specific, start with the most important
discoveries, show how the pieces relate, and use what the tests reveal about
expected behavior.

Use this structure:

## Executive Summary
[2-3 paragraphs directly answering the query]

## Key Code Elements
[Important classes, methods and relationships, grouped by area, noting test coverage]

## Architecture Insights
[Patterns, component interactions, testing strategies]

## Implementation Details
[Critical logic, dependencies, configuration, key test scenarios]

## Code Examples
[1-2 short snippets from source and tests, if relevant]

## Test Coverage Insights
[What is well tested, test patterns, gaps]

## Recommendations
[Next steps and areas of concern]
"#;

/// Prompts for plain JSON tool calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPrompts;

impl PromptSet for JsonPrompts {
    fn planning(&self, view: &PromptView<'_>) -> String {
        format!(
            "You are an autonomous code exploration agent with access to tools for analyzing code.\n\n\
             User Query: {}\n\n\
             Available Tools:\n{}\n\n\
             {}\n\
             Generate {}-5 initial tool calls. Always start with discovery tools, \
             and plan for both source and test exploration.\n",
            view.query(),
            view.tools,
            PLANNING_GUIDE,
            view.config.tools_per_round.max(1)
        )
    }

    fn exploration(&self, view: &PromptView<'_>) -> String {
        let ctx = view.context;
        let mut p = String::new();

        p.push_str("Continue exploring based on what you've discovered so far.\n\n");
        p.push_str(&format!("Original Query: {}\n\n", view.query()));
        p.push_str(&format!(
            "**Exploration Balance:** {}\n\n",
            ctx.exploration_stats()
        ));

        p.push_str("Previous Tool Executions:\n");
        for execution in ctx.recent_executions(view.config.recent_executions) {
            p.push_str(&format!("\nTool: {}\n", execution.tool_name));
            p.push_str(&format!("Parameters: {}\n", format_params(&execution.parameters)));
            p.push_str(&format!(
                "Result: {}\n",
                truncate(&execution.result, view.config.prompt_result_chars)
            ));
        }

        p.push_str("\n## NEXT STEPS\n\n");

        if ctx.needs_more_test_exploration() {
            p.push_str(&format!(
                "**Test Coverage Alert**: exploration is {:.0}% source. Explore some tests:\n\
                 - Look for files ending with Test, Tests or Spec\n\
                 - Use `find_by_name` with a 'Test' suffix for classes you've explored\n\
                 - Check /test/ directories\n\n",
                ctx.source_to_test_ratio() * 100.0
            ));
        } else if ctx.needs_more_source_exploration() {
            p.push_str(
                "**Source Coverage Alert**: balance is tilted toward tests. Focus on more source code.\n\n",
            );
        }

        let usage = ctx.tool_usage_stats();
        let used = |names: &[&str]| names.iter().any(|n| usage.contains_key(*n));
        if !used(&["search_code", "find_by_name"]) {
            p.push_str(
                "You haven't used discovery tools yet. Start with:\n\
                 - `search_code` for conceptual searches\n\
                 - `find_by_name` for specific class/method names\n\n",
            );
        } else if !used(&["read_file"]) {
            p.push_str(
                "Discovery done. Now examine implementations:\n\
                 - `read_file` to see the actual code\n\
                 - `get_class_info` for structural details\n\n",
            );
        } else if !used(&["find_relationships", "find_callers", "find_implementations"]) {
            p.push_str(
                "Implementation examined. Now explore relationships:\n\
                 - `find_relationships` to map dependencies\n\
                 - `find_callers` / `find_usages` to trace usage\n\n",
            );
        } else {
            p.push_str(
                "Deep exploration phase. Consider following relationships you found, \
                 similar code patterns, and edge cases in tests.\n\n",
            );
        }

        let unexplored = ctx.unexplored_elements();
        if !unexplored.is_empty() {
            p.push_str("### Discovered but unexplored elements:\n");
            for element in unexplored.iter().take(5) {
                let marker = if element.contains("Test") { " (TEST)" } else { "" };
                p.push_str(&format!("- {}{}\n", element, marker));
            }
            p.push('\n');
        }

        if !ctx.source_files().is_empty() && ctx.needs_more_test_exploration() {
            let suggestions = ctx.suggested_test_files();
            if !suggestions.is_empty() {
                p.push_str("### Suggested test files to explore:\n");
                for file in suggestions {
                    p.push_str(&format!("- {}\n", file));
                }
                p.push('\n');
            }
        }

        let next = ctx.suggested_next_elements();
        if !next.is_empty() {
            p.push_str("### Suggested elements to explore (based on relationships):\n");
            for element in next {
                p.push_str(&format!("- {}\n", element));
            }
            p.push('\n');
        }

        if ctx.has_adequate_coverage() {
            p.push_str(&format!(
                "### Coverage Status: Good\n\
                 You've made {} tool calls covering {} elements and {} files. \
                 Consider wrapping up unless you find critical gaps.\n\n",
                ctx.tool_call_count(),
                ctx.explored_elements().len(),
                ctx.explored_files().len()
            ));
        }

        p.push_str("Based on these results, what should we explore next?\n\n");
        p.push_str(EXPLORATION_TIPS);
        p.push_str(&format!("\nAvailable Tools:\n{}\n\n", view.tools));
        p.push_str(&format!(
            "Generate {}-5 tool calls that build on your discoveries, as JSON blocks:\n\
             ```json\n\
             {{\"tool\": \"tool_name\", \"parameters\": {{}}, \"reasoning\": \"How this extends our understanding\"}}\n\
             ```\n\
             If you have enough information, say \"exploration complete\" instead.\n",
            view.config.tools_per_round.max(1)
        ));

        p
    }

    fn summary(&self, view: &PromptView<'_>) -> String {
        let ctx = view.context;
        let mut p = String::new();

        p.push_str("Summarize the code exploration findings.\n\n");
        p.push_str(&format!("Original Query: {}\n\n", view.query()));

        p.push_str(&format!("Tools Used ({} calls):\n", ctx.tool_call_count()));
        for (tool, count) in ctx.tool_usage_stats() {
            p.push_str(&format!("- {}: {} times\n", tool, count));
        }

        p.push_str(&format!(
            "\nExploration Balance: {}\n",
            ctx.exploration_stats()
        ));

        let notes: Vec<_> = view
            .rounds
            .iter()
            .filter_map(|r| r.model_response.as_deref().map(|text| (&r.name, text)))
            .collect();
        if !notes.is_empty() {
            p.push_str("\nExploration Notes:\n");
            for (name, text) in notes {
                p.push_str(&format!("\n[{}]\n{}\n", name, text.trim()));
            }
        }

        p.push_str("\nKey Discoveries:\n");
        for execution in ctx.key_findings() {
            p.push_str(&format!(
                "\n{} - {}\n",
                execution.tool_name,
                truncate(&execution.result, SUMMARY_FINDING_CHARS)
            ));
        }

        p.push_str(SUMMARY_GUIDE);
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExplorationConfig;
    use crate::context::ExplorationContext;
    use crate::types::{ExplorationRound, ToolExecution};
    use serde_json::json;

    fn view<'a>(
        ctx: &'a ExplorationContext,
        config: &'a ExplorationConfig,
        tools: &'a str,
    ) -> PromptView<'a> {
        PromptView {
            context: ctx,
            config,
            rounds: &[],
            tools,
        }
    }

    #[test]
    fn test_planning_prompt() {
        let ctx = ExplorationContext::new("How does Leaderboard scoring work?");
        let config = ExplorationConfig::default();
        let prompt = JsonPrompts.planning(&view(&ctx, &config, "- **search_code**: Search"));

        assert!(prompt.contains("User Query: How does Leaderboard scoring work?"));
        assert!(prompt.contains("- **search_code**: Search"));
        assert!(prompt.contains("```json"));
    }

    #[test]
    fn test_exploration_prompt_steers_toward_tests() {
        let mut ctx = ExplorationContext::new("How does Leaderboard scoring work?");
        ctx.add_execution(ToolExecution::success(
            "read_file",
            json!({"filePath": "/p/src/main/java/Leaderboard.java"})
                .as_object()
                .cloned()
                .unwrap(),
            "x".repeat(900),
        ));
        let config = ExplorationConfig::default();
        let prompt = JsonPrompts.exploration(&view(&ctx, &config, "tools"));

        assert!(prompt.contains("**Exploration Balance:** Source files: 1"));
        assert!(prompt.contains("Test Coverage Alert"));
        assert!(prompt.contains("LeaderboardTest.java"));
        assert!(prompt.contains("You haven't used discovery tools yet"));
        // 500 chars of result then the ellipsis
        assert!(prompt.contains(&format!("Result: {}...", "x".repeat(500))));
        assert!(!prompt.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_summary_prompt() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(ToolExecution::success(
            "search_code",
            Default::default(),
            "y".repeat(400),
        ));
        let config = ExplorationConfig::default();
        let prompt = JsonPrompts.summary(&view(&ctx, &config, "tools"));

        assert!(prompt.contains("Tools Used (1 calls):"));
        assert!(prompt.contains("- search_code: 1 times"));
        assert!(prompt.contains(&format!("search_code - {}...", "y".repeat(300))));
        assert!(prompt.contains("## Executive Summary"));
        assert!(!prompt.contains("Exploration Notes:"));
    }

    #[test]
    fn test_summary_includes_round_notes() {
        let ctx = ExplorationContext::new("q");
        let config = ExplorationConfig::default();
        let mut planning = ExplorationRound::new("Planning");
        planning.model_response = Some("Start from Leaderboard.addScore.\n".to_string());
        let silent = ExplorationRound::new("Round 1");
        let mut second = ExplorationRound::new("Round 2");
        second.model_response = Some("Scores are capped in ScorePolicy.".to_string());
        let rounds = [planning, silent, second];

        let prompt = JsonPrompts.summary(&PromptView {
            context: &ctx,
            config: &config,
            rounds: &rounds,
            tools: "",
        });
        assert!(prompt.contains(
            "Exploration Notes:\n\n[Planning]\nStart from Leaderboard.addScore.\n\n[Round 2]\nScores are capped in ScorePolicy.\n"
        ));
        assert!(!prompt.contains("[Round 1]"));
        let notes = prompt.find("Exploration Notes:").unwrap();
        assert!(notes < prompt.find("Key Discoveries:").unwrap());
    }
}
