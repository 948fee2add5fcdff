//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,

    /// Show configuration file locations and which were loaded
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.config;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&loaded.config)?);
        return Ok(());
    }

    println!("# Delver Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)\n");
    } else {
        for source in &sources {
            println!("# from {}", source.display());
        }
        println!();
    }

    // Fill absent sections so every default is visible.
    let mut effective = loaded.config.clone();
    effective.exploration = Some(effective.exploration());
    effective.tools = Some(effective.tools());
    effective.logging = Some(effective.logging());
    if let Some(ref mut llm) = effective.llm
        && llm.api_key.is_some()
    {
        llm.api_key = Some("********".to_string());
    }
    println!("{}", effective.to_toml()?);

    for warning in &loaded.warnings {
        println!("# warning: {}", warning);
    }
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let sources: Vec<serde_json::Value> = ctx
            .config
            .sources
            .iter()
            .map(|s| {
                serde_json::json!({
                    "layer": s.layer.to_string(),
                    "path": s.path,
                    "loaded": s.loaded,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    println!("Config file search order (later overrides earlier):\n");
    for source in &ctx.config.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {:<8} {}", status, source.layer, source.path.display());
    }
    Ok(())
}
