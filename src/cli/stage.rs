use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use crate::capture::stage::{OperationKind, StagePrimitive, StageTrigger};
use crate::cli::context::ProjectContext;
use crate::cli::output::{format_report, OutputFormat};
use crate::storage::index::GitIndexStager;

/// Stage command arguments
#[derive(Debug, Args)]
pub struct StageArgs {
    /// Candidate paths (default: paths whose index content differs from HEAD)
    pub paths: Vec<String>,

    /// Operation that triggered the pass
    #[arg(long, default_value = "commit")]
    pub kind: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}

/// Preview command arguments
#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// File to preview
    pub file: String,
}

/// Run a staging pass
///
/// Per-path failures are reported but do not fail the command, so a hook
/// running it never blocks the commit over one file.
pub fn run_stage(args: StageArgs) -> Result<()> {
    let ctx = ProjectContext::open()?;
    if !ctx.config.staging.enabled {
        info!("staging disabled by configuration");
        return Ok(());
    }

    let mut state = ctx.load()?;
    if !state.session.store().has_marks() {
        debug!("no marks, nothing to stage");
        return Ok(());
    }

    let source = ctx.source();
    if ctx.config.staging.sync_before_stage {
        state.sync_all(&source);
    }

    let kind: OperationKind = match args.kind.parse() {
        Ok(kind) => kind,
        Err(never) => match never {},
    };

    let stager = GitIndexStager::from_env();
    let paths = if args.paths.is_empty() {
        match &stager {
            Ok(stager) => stager.index_changes()?,
            Err(_) => Vec::new(),
        }
    } else {
        args.paths
            .iter()
            .map(|p| ctx.relative_path(p))
            .collect::<Result<Vec<_>>>()?
    };

    state.session.attach_stager(
        stager.map(|s| Box::new(s) as Box<dyn StagePrimitive>),
        ctx.config.staging.operation_kinds(),
    );

    let trigger = StageTrigger::new(kind, paths);
    let report = state.session.handle_stage_trigger(&source, &trigger)?;
    ctx.save(&state)?;

    match report {
        Some(report) => print!("{}", format_report(&report, args.format)),
        None => debug!(kind = %trigger.kind, "operation kind does not trigger staging"),
    }
    Ok(())
}

/// Print the content a staging pass would stage for a file
pub fn run_preview(args: PreviewArgs) -> Result<()> {
    let ctx = ProjectContext::open()?;
    let path = ctx.relative_path(&args.file)?;

    let mut state = ctx.load()?;
    let source = ctx.source();
    if state.sync_path(&source, &path) > 0 {
        ctx.save(&state)?;
    }

    let content = state.session.preview(&source, &path)?;
    io::stdout()
        .write_all(&content)
        .context("Failed to write preview")?;
    Ok(())
}
