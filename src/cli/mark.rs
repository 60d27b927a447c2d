use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::capture::reconstruct::line_count;
use crate::capture::stage::DocumentSource;
use crate::cli::context::ProjectContext;
use crate::core::presentation::range_label;
use crate::core::rows::RowRange;
use crate::core::session::MarkOp;

/// Mark command arguments
#[derive(Debug, Args)]
pub struct MarkArgs {
    /// File containing the lines
    pub file: String,

    /// Line or inclusive line range, e.g. `12` or `12..20`
    pub lines: String,
}

/// Unmark command arguments
#[derive(Debug, Args)]
pub struct UnmarkArgs {
    /// File containing the lines
    pub file: String,

    /// Line or inclusive line range, e.g. `12` or `12..20`
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub lines: Option<String>,

    /// Unmark every line of the file
    #[arg(long)]
    pub all: bool,
}

/// Run the mark command
pub fn run_mark(args: MarkArgs) -> Result<()> {
    let ctx = ProjectContext::open()?;
    let path = ctx.relative_path(&args.file)?;
    let range = RowRange::parse_one_based(&args.lines)?;

    let mut state = ctx.load()?;
    let source = ctx.source();
    // Bring existing marks up to date before adding rows against the new content
    state.sync_path(&source, &path);

    let content = source.read(&path)?;
    let range = selection_in_document(range, &path, &content)?;

    let added = state.session.handle_mark_request(&path, range, MarkOp::Add);
    state.record_snapshot(&source, &path);
    ctx.save(&state)?;

    println!(
        "{} {} in {} {}",
        "Marked".green(),
        range_label(range, ctx.numbering()),
        path.bold(),
        format!("({} new)", added).dimmed()
    );
    Ok(())
}

/// Run the unmark command
pub fn run_unmark(args: UnmarkArgs) -> Result<()> {
    let ctx = ProjectContext::open()?;
    let path = ctx.relative_path(&args.file)?;

    let mut state = ctx.load()?;
    let source = ctx.source();
    state.sync_path(&source, &path);

    if args.all {
        let removed = state.session.store_mut().clear_path(&path);
        state.drop_snapshot(&path);
        ctx.save(&state)?;
        println!("{} {} lines in {}", "Unmarked".green(), removed, path.bold());
        return Ok(());
    }

    let Some(lines) = args.lines.as_deref() else {
        anyhow::bail!("Specify lines to unmark or pass --all");
    };
    let range = RowRange::parse_one_based(lines)?;
    let removed = state
        .session
        .handle_mark_request(&path, range, MarkOp::Remove);
    ctx.save(&state)?;

    if removed == 0 {
        println!("No marked lines in {} of {}.", range_label(range, ctx.numbering()), path);
    } else {
        println!(
            "{} {} in {} {}",
            "Unmarked".green(),
            range_label(range, ctx.numbering()),
            path.bold(),
            format!("({} removed)", removed).dimmed()
        );
    }
    Ok(())
}

/// Restrict a selection to the lines that exist in `content`
fn selection_in_document(range: RowRange, path: &str, content: &[u8]) -> Result<RowRange> {
    let lines = line_count(content);
    range.clamp_to(lines).ok_or_else(|| {
        anyhow::anyhow!(
            "Line {} is past the end of {} ({} lines)",
            u64::from(range.start) + 1,
            path,
            lines
        )
    })
}
