pub mod context;
pub mod edit;
pub mod hook;
pub mod list;
pub mod mark;
pub mod output;
pub mod stage;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use git2::Repository;

use crate::cli::context::ProjectContext;
use crate::cli::hook::HookInstall;

/// Leave marked lines out of what git stages
#[derive(Debug, Parser)]
#[command(name = "auto-unstage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mark lines so they are left out of the next stage
    Mark(mark::MarkArgs),

    /// Remove marks from lines
    Unmark(mark::UnmarkArgs),

    /// List marked lines grouped by file
    List(list::ListArgs),

    /// Print the lines of a marked range
    Show(list::ShowArgs),

    /// Apply an editor change notification to marks (reads JSON from stdin)
    Edit(edit::EditArgs),

    /// Re-anchor marks against the current work tree
    Sync(edit::SyncArgs),

    /// Stage marked files without their marked lines (pre-commit hook)
    Stage(stage::StageArgs),

    /// Print the content that would be staged for a file
    Preview(stage::PreviewArgs),

    /// Show how many lines are marked
    Status,

    /// Drop every mark
    Clear,

    /// Initialize auto-unstage in a git repository (installs pre-commit hook)
    Init,
}

impl Cli {
    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };

        // stderr keeps hook and preview output on stdout clean
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr);

        if self.no_color {
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.setup_logging();
    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Mark(args) => mark::run_mark(args),
        Commands::Unmark(args) => mark::run_unmark(args),
        Commands::List(args) => list::run_list(args),
        Commands::Show(args) => list::run_show(args),
        Commands::Edit(args) => edit::run_edit(args),
        Commands::Sync(args) => edit::run_sync(args),
        Commands::Stage(args) => stage::run_stage(args),
        Commands::Preview(args) => stage::run_preview(args),
        Commands::Status => run_status(),
        Commands::Clear => run_clear(),
        Commands::Init => run_init(),
    }
}

fn run_status() -> Result<()> {
    let ctx = ProjectContext::open()?;
    let state = ctx.load()?;
    let store = state.session.store();

    if store.has_marks() {
        println!("Marked lines:");
        println!("  Files: {}", store.marked_paths().len());
        println!("  Lines: {}", store.total_rows());
        if !ctx.in_repo {
            println!("\n{}", "Not in a git repository; staging is unavailable.".yellow());
        } else if !ctx.config.staging.enabled {
            println!("\n{}", "Staging is disabled in configuration.".yellow());
        } else {
            println!("\nRun 'git commit' to stage without them.");
        }
    } else {
        println!("No marked lines.");
    }

    Ok(())
}

fn run_clear() -> Result<()> {
    let ctx = ProjectContext::open()?;
    ctx.marker_store().delete()?;

    println!("Cleared all marks.");

    Ok(())
}

fn run_init() -> Result<()> {
    let repo = Repository::open_from_env().context("Not in a git repository")?;
    if repo.workdir().is_none() {
        anyhow::bail!("No working directory");
    }

    match hook::install_pre_commit(&repo)? {
        HookInstall::AlreadyInstalled(_) => {
            println!("auto-unstage pre-commit hook already installed.");
            return Ok(());
        }
        HookInstall::Appended(_) => println!("Added auto-unstage to existing pre-commit hook."),
        HookInstall::Created(_) => println!("Installed auto-unstage pre-commit hook."),
    }

    println!("\nSetup complete! Marked lines will be left out of commits in this repo.");

    Ok(())
}
