use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capture::reconstruct::{excluded_line_count, reconstruct, split_lines};
use crate::core::rows::MarkedRowSet;
use crate::core::store::RowStore;
use crate::error::UnstageError;

/// Source of a document's current content
pub trait DocumentSource {
    /// Full current content of `path`, reflecting every edit already applied
    fn read(&self, path: &str) -> Result<Vec<u8>, UnstageError>;
}

/// Makes given content the staged version of a path
pub trait StagePrimitive {
    fn stage(&mut self, path: &str, content: &[u8]) -> Result<(), UnstageError>;
}

/// Kind of staging operation that triggered a pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Paths were added to the index
    Add,
    /// A commit is about to be recorded
    Commit,
    /// Anything else reported by the host
    Other(String),
}

impl FromStr for OperationKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "add" => OperationKind::Add,
            "commit" | "pre-commit" => OperationKind::Commit,
            other => OperationKind::Other(other.to_string()),
        })
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Commit => write!(f, "commit"),
            Self::Other(kind) => write!(f, "{kind}"),
        }
    }
}

/// Notification that a staging operation ran over some candidate paths
#[derive(Debug, Clone)]
pub struct StageTrigger {
    pub kind: OperationKind,
    pub paths: Vec<String>,
}

impl StageTrigger {
    pub fn new(kind: OperationKind, paths: Vec<String>) -> Self {
        Self { kind, paths }
    }
}

/// A path whose staged content was replaced
#[derive(Debug, Clone, Serialize)]
pub struct StagedFile {
    pub path: String,
    /// Marked lines that existed in the document and were left out
    pub excluded_lines: usize,
    /// Size of the staged content
    pub staged_bytes: usize,
}

/// A path that could not be staged
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of one staging pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct StagingReport {
    pub staged: Vec<StagedFile>,
    /// Candidate paths without marks, left as the host staged them
    pub skipped: Vec<String>,
    pub failed: Vec<StageFailure>,
}

impl StagingReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn excluded_lines(&self) -> usize {
        self.staged.iter().map(|f| f.excluded_lines).sum()
    }
}

/// Replaces the staged content of marked files with their selective version
pub struct StagingCoordinator {
    stager: Box<dyn StagePrimitive>,
    trigger_kinds: Vec<OperationKind>,
}

impl StagingCoordinator {
    pub fn new(stager: Box<dyn StagePrimitive>, trigger_kinds: Vec<OperationKind>) -> Self {
        Self {
            stager,
            trigger_kinds,
        }
    }

    /// Whether a trigger of this kind starts a pass
    pub fn accepts(&self, kind: &OperationKind) -> bool {
        self.trigger_kinds.contains(kind)
    }

    /// Run one staging pass
    ///
    /// Returns `None` when the trigger kind is not one this coordinator reacts
    /// to. Each path's marks are read once, before its content is read. A
    /// failing path is recorded and the rest of the batch still runs.
    pub fn run(
        &mut self,
        store: &RowStore,
        source: &dyn DocumentSource,
        trigger: &StageTrigger,
    ) -> Option<StagingReport> {
        if !self.accepts(&trigger.kind) {
            debug!(kind = %trigger.kind, "ignoring staging operation");
            return None;
        }

        let mut report = StagingReport::default();
        for path in &trigger.paths {
            let marked = store.marked_rows(path);
            if marked.is_empty() {
                report.skipped.push(path.clone());
                continue;
            }

            match self.stage_path(path, &marked, source) {
                Ok(staged) => {
                    info!(
                        path = %staged.path,
                        excluded = staged.excluded_lines,
                        "staged selective content"
                    );
                    report.staged.push(staged);
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "selective staging failed");
                    report.failed.push(StageFailure {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Some(report)
    }

    fn stage_path(
        &mut self,
        path: &str,
        marked: &MarkedRowSet,
        source: &dyn DocumentSource,
    ) -> Result<StagedFile, UnstageError> {
        let content = source.read(path)?;
        let lines = split_lines(&content);
        let staged = reconstruct(&lines, marked);

        self.stager.stage(path, &staged)?;

        Ok(StagedFile {
            path: path.to_string(),
            excluded_lines: excluded_line_count(&lines, marked),
            staged_bytes: staged.len(),
        })
    }
}
