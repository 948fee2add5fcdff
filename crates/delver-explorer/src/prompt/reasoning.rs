//! The reasoning dialect.
//!
//! Prompts adapt to the session's stage (nothing run yet, mid-exploration,
//! near the call budget) and replay the full conversation so far: the query,
//! each round's model text, and each round's tool results.

use super::{PromptSet, PromptView, format_params};
use crate::types::ExplorationRound;

const INTRO: &str = "You are an autonomous code exploration agent specialized in analyzing codebases.\n\
Your approach: systematic (start broad, then narrow), efficient (no redundant calls), \
thorough (follow relationships and tests).\n\n";

const INITIAL_STAGE: &str = r#"GOAL: Understand the codebase well enough to answer the query.

EXPECTED OUTPUT: Tool calls that discover the relevant code.

RESPONSE FORMAT:
```json
{
  "tool": "tool_name",
  "parameters": {"param": "value"},
  "reasoning": "One line: what this call should find",
  "deepreasoning": "Why this is the right next step given what we know"
}
```
"#;

const MID_STAGE: &str = "Continue with more tool calls in the same JSON format, each with \
\"reasoning\" and \"deepreasoning\".\n\
If you have gathered enough, reply with a summary that starts with \"EXPLORATION COMPLETE:\".\n";

const FINAL_STAGE: &str = "NO MORE TOOL CALLS. The tool budget is nearly used up.\n\
Reply with a summary that starts with \"EXPLORATION COMPLETE:\".\n";

const SUMMARY_GUIDE: &str = r#"
Produce a CONTEXT REPORT with these sections:

## Query Understanding
[What is being asked and which parts of the code it touches]

## Relevant Code Elements
[Classes, methods and files, with their paths]

## Related Code Snippets
[Short verbatim snippets from the tool results]

## Code Structure & Relationships
[How the elements connect: calls, inheritance, usage]

## Current Implementation Patterns
[Conventions the code follows that a change must respect]

## Context Summary
[The essential facts needed to act on the query]

RULES:
- Only cite code that appeared in the tool results.
- Keep snippets short and exact.
- Name files by path.
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Initial,
    Exploring,
    Final,
}

impl Stage {
    fn of(view: &PromptView<'_>) -> Self {
        let calls = view.context.tool_call_count();
        if calls == 0 {
            Self::Initial
        } else if calls + 2 < view.config.max_tool_calls {
            Self::Exploring
        } else {
            Self::Final
        }
    }
}

/// Prompts for tool calls annotated with reasoning.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReasoningPrompts;

impl ReasoningPrompts {
    fn staged(&self, view: &PromptView<'_>) -> String {
        let stage = Stage::of(view);
        let mut p = String::from(INTRO);

        p.push_str(&format!("Available Tools:\n{}\n\n", view.tools));
        p.push_str(&format!(
            "Progress: {}/{} tool calls used\n\n",
            view.context.tool_call_count(),
            view.config.max_tool_calls
        ));

        p.push_str(match stage {
            Stage::Initial => INITIAL_STAGE,
            Stage::Exploring => MID_STAGE,
            Stage::Final => FINAL_STAGE,
        });

        p.push_str("\nConversation History:\n\n");
        p.push_str(&format!("USER QUERY: {}\n\n", view.query()));
        for round in view.rounds {
            if let Some(ref text) = round.model_response {
                p.push_str(&format!("YOUR EXPLORATION: {}\n\n", text));
            }
            if !round.executions.is_empty() {
                p.push_str("[TOOL EXECUTION RESULTS]\n");
                p.push_str(&render_results(round));
            }
        }

        p.push_str(match stage {
            Stage::Initial => "Analyze the query and begin exploration:\n",
            Stage::Exploring => {
                "Based on results so far, continue exploration or summarize if complete:\n"
            }
            Stage::Final => "Synthesize all findings into a comprehensive summary:\n",
        });
        p
    }
}

impl PromptSet for ReasoningPrompts {
    fn planning(&self, view: &PromptView<'_>) -> String {
        self.staged(view)
    }

    fn exploration(&self, view: &PromptView<'_>) -> String {
        self.staged(view)
    }

    fn summary(&self, view: &PromptView<'_>) -> String {
        let mut p = String::from(
            "Based on the complete exploration, provide a CONCRETE IMPLEMENTATION GUIDE for the query.\n\n",
        );
        p.push_str(&format!("Original Query: {}\n\n", view.query()));
        p.push_str(&format!(
            "Exploration Balance: {}\n\n",
            view.context.exploration_stats()
        ));

        p.push_str("Full Exploration History:\n\n");
        for round in view.rounds {
            if let Some(ref text) = round.model_response {
                p.push_str(&format!("[{}]\n{}\n\n", round.name, text));
            }
            if !round.executions.is_empty() {
                p.push_str("[Tool Results]\n");
                p.push_str(&render_results(round));
            }
        }

        p.push_str(SUMMARY_GUIDE);
        p
    }
}

/// Full, untruncated tool results of one round.
fn render_results(round: &ExplorationRound) -> String {
    let mut out = String::from("Tool execution results:\n\n");
    for execution in &round.executions {
        out.push_str(&format!("### Tool: {}\n", execution.tool_name));
        out.push_str(&format!("Parameters: {}\n", format_params(&execution.parameters)));
        out.push_str(&format!(
            "Status: {}\n",
            if execution.success { "Success" } else { "Failed" }
        ));
        out.push_str(&format!("Result:\n{}\n\n", execution.result));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExplorationConfig;
    use crate::context::ExplorationContext;
    use crate::types::{Parameters, ToolExecution};

    #[test]
    fn test_initial_stage() {
        let ctx = ExplorationContext::new("Where is scoring?");
        let config = ExplorationConfig::default();
        let view = PromptView {
            context: &ctx,
            config: &config,
            rounds: &[],
            tools: "- read_file",
        };
        let prompt = ReasoningPrompts.planning(&view);

        assert!(prompt.starts_with("You are an autonomous code exploration agent"));
        assert!(prompt.contains("Progress: 0/20 tool calls used"));
        assert!(prompt.contains("\"deepreasoning\""));
        assert!(prompt.contains("USER QUERY: Where is scoring?"));
        assert!(prompt.ends_with("Analyze the query and begin exploration:\n"));
    }

    #[test]
    fn test_history_and_final_stage() {
        let mut ctx = ExplorationContext::new("q");
        let execution = ToolExecution::success("read_file", Parameters::new(), "class Score {}");
        ctx.add_execution(execution.clone());

        let mut round = ExplorationRound::new("Planning");
        round.model_response = Some("Let me read the file.".to_string());
        round.executions.push(execution);
        let rounds = vec![round];

        let config = ExplorationConfig::default().with_max_tool_calls(3);
        let view = PromptView {
            context: &ctx,
            config: &config,
            rounds: &rounds,
            tools: "",
        };
        let prompt = ReasoningPrompts.exploration(&view);

        assert!(prompt.contains("NO MORE TOOL CALLS"));
        assert!(prompt.contains("YOUR EXPLORATION: Let me read the file."));
        assert!(prompt.contains("### Tool: read_file\nParameters: {}\nStatus: Success\nResult:\nclass Score {}"));
        assert!(prompt.ends_with("Synthesize all findings into a comprehensive summary:\n"));
    }

    #[test]
    fn test_mid_stage() {
        let mut ctx = ExplorationContext::new("q");
        ctx.add_execution(ToolExecution::failure("read_file", Parameters::new(), "boom"));
        let config = ExplorationConfig::default();
        let view = PromptView {
            context: &ctx,
            config: &config,
            rounds: &[],
            tools: "",
        };
        let prompt = ReasoningPrompts.exploration(&view);
        assert!(prompt.contains("EXPLORATION COMPLETE:"));
        assert!(prompt.ends_with("continue exploration or summarize if complete:\n"));
    }

    #[test]
    fn test_summary_guide() {
        let ctx = ExplorationContext::new("q");
        let config = ExplorationConfig::default();
        let mut round = ExplorationRound::new("Round 1");
        round
            .executions
            .push(ToolExecution::failure("x", Parameters::new(), "Error: nope"));
        let rounds = [round];
        let view = PromptView {
            context: &ctx,
            config: &config,
            rounds: &rounds,
            tools: "",
        };
        let prompt = ReasoningPrompts.summary(&view);
        assert!(prompt.contains("CONCRETE IMPLEMENTATION GUIDE"));
        assert!(prompt.contains("[Tool Results]\nTool execution results:"));
        assert!(prompt.contains("Status: Failed"));
        assert!(prompt.contains("## Context Summary"));
    }
}
