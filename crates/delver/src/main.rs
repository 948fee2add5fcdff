//! Delver - autonomous code exploration
//!
//! Main entry point for the Delver CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, explore, report, tools};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Delver - answers questions about a codebase by exploring it with an LLM
#[derive(Parser)]
#[command(name = "delver")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Project root explored by the local tools (default: [tools].root)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Remote tool server URL; replaces the local tools
    #[arg(long, global = true, env = "DELVER_TOOL_SERVER")]
    pub tool_server: Option<String>,

    /// Maximum tool calls per exploration
    #[arg(long, global = true)]
    pub max_tool_calls: Option<usize>,

    /// Maximum exploration rounds after planning
    #[arg(long, global = true)]
    pub max_rounds: Option<usize>,

    /// Prompt dialect
    #[arg(long, global = true, value_enum)]
    pub dialect: Option<commands::DialectArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Explore the codebase to answer a question
    Explore(explore::ExploreArgs),

    /// Explore, then synthesize a code report
    Report(report::ReportArgs),

    /// List the available tools
    Tools(tools::ToolsArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is loaded before tracing so [logging] can shape the subscriber.
    let loaded = delver_config::load_config(None)?;
    let logging = loaded.config.logging();

    // Initialize tracing: console (human-readable) + rotating JSON file
    let default_filter = if cli.verbose {
        "delver=debug,delver_explorer=debug,delver_llm=debug,delver_config=debug,info"
    } else {
        "delver=info,delver_explorer=info,delver_llm=info,warn"
    };
    let console_filter = if cli.verbose {
        default_filter.to_string()
    } else {
        logging
            .console_filter
            .clone()
            .unwrap_or_else(|| default_filter.to_string())
    };

    let log_dir = logging.dir.clone().unwrap_or_else(|| {
        delver_config::xdg_config_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    });

    use tracing_subscriber::prelude::*;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::new(console_filter));

    let _guard = if logging.file {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "delver.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::registry()
            .with(console_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_filter(tracing_subscriber::EnvFilter::new(
                        "delver=trace,delver_explorer=trace,delver_llm=trace,delver_config=trace,info",
                    )),
            )
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry().with(console_layer).init();
        None
    };

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    // Create context for commands
    let ctx = commands::Context {
        config: loaded,
        json_output: cli.json,
        verbose: cli.verbose,
        overrides: commands::Overrides {
            root: cli.root,
            tool_server: cli.tool_server,
            max_tool_calls: cli.max_tool_calls,
            max_rounds: cli.max_rounds,
            dialect: cli.dialect,
        },
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Explore(args) => explore::run(args, &ctx).await,
        Commands::Report(args) => report::run(args, &ctx).await,
        Commands::Tools(args) => tools::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
