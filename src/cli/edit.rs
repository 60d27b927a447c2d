use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::capture::edit::{ContentChange, EditDescription};
use crate::cli::context::ProjectContext;

/// Edit command arguments
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Read the change notification from stdin
    #[arg(long)]
    pub stdin: bool,
}

/// Sync command arguments
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Only sync this file
    pub file: Option<String>,
}

/// Change notification as an editor sends it
///
/// ```json
/// {"path": "src/lib.rs", "changes": [{"range": {"start": {"line": 3, "character": 0},
///   "end": {"line": 3, "character": 0}}, "text": "new line\n"}]}
/// ```
#[derive(Debug, Deserialize)]
pub struct EditNotification {
    pub path: String,
    pub changes: Vec<ContentChange>,
}

/// Run the edit command
pub fn run_edit(args: EditArgs) -> Result<()> {
    if !args.stdin {
        anyhow::bail!("Edit requires --stdin flag for the change notification");
    }

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    let notification: EditNotification =
        serde_json::from_str(&input).context("Failed to parse change notification")?;

    let ctx = ProjectContext::open()?;
    let path = ctx.relative_path(&notification.path)?;
    let mut state = ctx.load()?;

    let mut applied = 0;
    for change in notification.changes {
        match EditDescription::try_from(change) {
            Ok(edit) => {
                if state.session.handle_edit(&path, &edit) {
                    applied += 1;
                }
            }
            Err(e) => warn!(path = %path, error = %e, "ignoring change"),
        }
    }

    // The editor now owns the line positions; a later sync starts from the
    // content on disk at that point
    state.drop_snapshot(&path);
    ctx.save(&state)?;

    debug!(path = %path, applied, "applied change notification");
    Ok(())
}

/// Run the sync command
pub fn run_sync(args: SyncArgs) -> Result<()> {
    let ctx = ProjectContext::open()?;
    let mut state = ctx.load()?;
    let source = ctx.source();

    let edits = match args.file.as_deref() {
        Some(file) => {
            let path = ctx.relative_path(file)?;
            state.sync_path(&source, &path)
        }
        None => state.sync_all(&source),
    };
    ctx.save(&state)?;

    if edits == 0 {
        println!("Marks are up to date.");
    } else {
        println!("Applied {} edits to marks.", edits);
    }
    Ok(())
}
