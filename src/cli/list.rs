use anyhow::Result;
use clap::Args;

use crate::cli::context::ProjectContext;
use crate::cli::output::{format_focus, format_nodes, OutputFormat};
use crate::core::presentation::file_node;
use crate::core::rows::RowRange;

/// List command arguments
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only show this file
    pub file: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Skip re-anchoring marks against the work tree
    #[arg(long)]
    pub no_sync: bool,
}

/// Show command arguments
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// File containing the range
    pub file: String,

    /// Line or inclusive line range, as printed by `list`
    pub range: String,
}

/// Run the list command
pub fn run_list(args: ListArgs) -> Result<()> {
    let ctx = ProjectContext::open()?;
    let mut state = ctx.load()?;

    if !args.no_sync && state.sync_all(&ctx.source()) > 0 {
        ctx.save(&state)?;
    }

    let numbering = ctx.numbering();
    let nodes = match args.file.as_deref() {
        Some(file) => {
            let path = ctx.relative_path(file)?;
            file_node(state.session.store(), &path, numbering)
                .into_iter()
                .collect()
        }
        None => state.session.presentation(numbering),
    };

    print!("{}", format_nodes(&nodes, args.format));
    Ok(())
}

/// Run the show command
pub fn run_show(args: ShowArgs) -> Result<()> {
    let ctx = ProjectContext::open()?;
    let path = ctx.relative_path(&args.file)?;
    let range = RowRange::parse_one_based(&args.range)?;

    let state = ctx.load()?;
    let lines = state.session.focus_range(&ctx.source(), &path, range)?;

    print!("{}", format_focus(&path, &lines, ctx.numbering()));
    Ok(())
}
