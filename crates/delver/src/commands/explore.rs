//! Explore command - run the exploration loop for one question.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::Style;
use delver_explorer::{
    ExplorationResult, Explorer, FnProgress, ProgressEvent, ProgressNotifier, ToolExecution,
};

use super::{Context, cancel_on_ctrl_c};

/// Arguments for the explore command.
#[derive(Args, Debug)]
pub struct ExploreArgs {
    /// The question to answer about the codebase
    #[arg(required = true)]
    pub query: String,

    /// Print every tool result in full
    #[arg(long)]
    pub full: bool,
}

/// Run the explore command.
pub async fn run(args: ExploreArgs, ctx: &Context) -> Result<()> {
    let explorer = build_explorer(ctx).await?;
    let cancel = cancel_on_ctrl_c();

    let progress = live_progress();
    let progress: Option<&dyn ProgressNotifier> = if ctx.json_output {
        None
    } else {
        Some(&progress)
    };

    let result = explorer.explore(&args.query, Some(&cancel), progress).await;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, args.full || ctx.verbose);
    }
    Ok(())
}

/// Explorer wired from config, flags and the selected tool source.
pub(crate) async fn build_explorer(ctx: &Context) -> Result<Explorer> {
    let config = ctx.exploration_config()?;
    let registry = ctx.registry().await?;
    let backend = ctx.backend()?;

    if ctx.verbose {
        let dim = Style::new().dim();
        eprintln!(
            "{}",
            dim.apply_to(format!(
                "Tools: {} | budget: {} calls, {} rounds | dialect: {:?}",
                registry.len(),
                config.max_tool_calls,
                config.max_rounds,
                config.dialect
            ))
        );
    }

    Ok(Explorer::new(backend, Arc::new(registry)).with_config(config))
}

/// Progress lines on stderr while the loop runs.
pub(crate) fn live_progress() -> FnProgress<impl Fn(ProgressEvent) + Send + Sync> {
    FnProgress::new(|event| {
        let dim = Style::new().dim();
        match event {
            ProgressEvent::ToolExecuted { execution } => {
                eprintln!("{}", dim.apply_to(format!("  {}", execution_line(&execution))));
            }
            ProgressEvent::RoundComplete { round } => {
                eprintln!(
                    "{}",
                    dim.apply_to(format!(
                        "[{}] {} tool calls",
                        round.name,
                        round.executions.len()
                    ))
                );
            }
            ProgressEvent::ExplorationComplete { .. } => {}
        }
    })
}

fn execution_line(execution: &ToolExecution) -> String {
    let mark = if execution.success { "✓" } else { "✗" };
    let params = serde_json::Value::Object(execution.parameters.clone());
    format!("{} {} {}", mark, execution.tool_name, params)
}

fn print_result(result: &ExplorationResult, full: bool) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    let red = Style::new().red();

    println!("{}", bold.apply_to(format!("Query: {}", result.query)));
    println!();

    for round in &result.rounds {
        println!("{}", bold.apply_to(format!("## {}", round.name)));
        if round.name == "Planning" && !result.planned_tools.is_empty() {
            for call in &result.planned_tools {
                println!("  planned: {}", call.tool);
            }
        }
        for execution in &round.executions {
            println!("  {}", execution_line(execution));
            if full {
                for line in execution.result.lines() {
                    println!("    {}", dim.apply_to(line));
                }
            }
        }
        println!();
    }

    match result.summary {
        Some(ref summary) => {
            println!("{}", bold.apply_to("## Summary"));
            println!("{}", summary);
        }
        None => println!("{}", dim.apply_to("(no summary)")),
    }
    println!();

    for error in &result.errors {
        eprintln!("{} {}", red.apply_to("Error:"), error);
    }
    println!(
        "{}",
        dim.apply_to(format!(
            "{} tool calls in {} rounds, stopped: {} ({:.1}s)",
            result.total_executions(),
            result.rounds.len(),
            result.termination,
            result.duration().num_milliseconds() as f64 / 1000.0
        ))
    );
}
