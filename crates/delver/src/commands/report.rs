//! Report command - explore, then synthesize a code report.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;
use delver_explorer::{CodeAccess, ProgressNotifier};

use super::explore::{build_explorer, live_progress};
use super::{Context, cancel_on_ctrl_c};

/// Arguments for the report command.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// The question to answer about the codebase
    #[arg(required = true)]
    pub query: String,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip fetching full method and class bodies
    #[arg(long)]
    pub no_enrich: bool,
}

/// Run the report command.
pub async fn run(args: ReportArgs, ctx: &Context) -> Result<()> {
    let explorer = build_explorer(ctx).await?;
    let cancel = cancel_on_ctrl_c();

    let progress = live_progress();
    let progress: Option<&dyn ProgressNotifier> = if ctx.json_output {
        None
    } else {
        Some(&progress)
    };

    let access = if args.no_enrich {
        None
    } else {
        ctx.code_access()
    };
    let access = access.as_ref().map(|a| a as &dyn CodeAccess);

    let report = explorer
        .explore_and_report(&args.query, Some(&cancel), progress, access)
        .await;

    let rendered = if ctx.json_output {
        serde_json::to_string_pretty(&report)?
    } else {
        report.coding_context.clone()
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            let dim = Style::new().dim();
            eprint!("{}", dim.apply_to(report.summary_text()));
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
