//! Tools command - list the capabilities available to the explorer.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the tools command.
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Show each tool's parameter schema
    #[arg(long)]
    pub schema: bool,
}

/// Run the tools command.
pub async fn run(args: ToolsArgs, ctx: &Context) -> Result<()> {
    let registry = ctx.registry().await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&registry.list_tools())?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No tools available");
        return Ok(());
    }

    let bold = Style::new().bold();
    let dim = Style::new().dim();
    for (category, tools) in registry.grouped() {
        println!("{}", bold.apply_to(category.heading()));
        for tool in tools {
            println!("  {:<26} {}", tool.name, dim.apply_to(&tool.description));
            if args.schema {
                let schema = serde_json::to_string_pretty(&tool.parameters)?;
                for line in schema.lines() {
                    println!("      {}", dim.apply_to(line));
                }
            }
        }
        println!();
    }
    Ok(())
}
