use tracing::{debug, error};

use crate::capture::edit::EditDescription;
use crate::capture::reconstruct::{lines_in_range, reconstruct_content};
use crate::capture::stage::{
    DocumentSource, OperationKind, StagePrimitive, StageTrigger, StagingCoordinator,
    StagingReport,
};
use crate::core::presentation::{file_nodes, FileNode, LineNumbering};
use crate::core::rows::{Row, RowRange};
use crate::core::store::RowStore;
use crate::error::UnstageError;

/// Direction of a mark request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOp {
    Add,
    Remove,
}

/// Owns the row store and dispatches host events to it
///
/// Each handler takes one message and updates the store; scheduling and
/// wiring stay with the host.
pub struct MarkerSession {
    store: RowStore,
    coordinator: Option<StagingCoordinator>,
    /// Why no coordinator could be attached, reported on every trigger
    stager_unavailable: Option<String>,
    /// Operation kinds that start a pass, kept when no coordinator exists
    trigger_kinds: Vec<OperationKind>,
}

impl MarkerSession {
    pub fn new(store: RowStore) -> Self {
        Self {
            store,
            coordinator: None,
            stager_unavailable: None,
            trigger_kinds: Vec::new(),
        }
    }

    /// Attach the stage primitive located at startup
    ///
    /// A failed lookup is logged here, once; later staging triggers return
    /// `MissingDependency` without trying to locate it again. Marking and
    /// listing keep working either way.
    pub fn attach_stager(
        &mut self,
        stager: Result<Box<dyn StagePrimitive>, UnstageError>,
        trigger_kinds: Vec<OperationKind>,
    ) {
        match stager {
            Ok(stager) => {
                self.coordinator = Some(StagingCoordinator::new(stager, trigger_kinds.clone()));
                self.stager_unavailable = None;
            }
            Err(e) => {
                error!(error = %e, "selective staging disabled");
                self.coordinator = None;
                self.stager_unavailable = Some(e.to_string());
            }
        }
        self.trigger_kinds = trigger_kinds;
    }

    pub fn can_stage(&self) -> bool {
        self.coordinator.is_some()
    }

    /// Mark or unmark a selection, returning how many rows changed
    pub fn handle_mark_request(&mut self, path: &str, range: RowRange, op: MarkOp) -> usize {
        let changed = match op {
            MarkOp::Add => self.store.add_rows(path, range),
            MarkOp::Remove => self.store.remove_rows(path, range),
        };
        debug!(path, range = %range, ?op, changed, "mark request");
        changed
    }

    /// Apply one edit notification, in delivery order
    pub fn handle_edit(&mut self, path: &str, edit: &EditDescription) -> bool {
        self.store.apply_edit(path, edit)
    }

    /// Run a staging pass for a trigger
    ///
    /// `Ok(None)` means the trigger kind is not one that starts a pass. Such
    /// triggers are ignored even when no stage primitive is available.
    pub fn handle_stage_trigger(
        &mut self,
        source: &dyn DocumentSource,
        trigger: &StageTrigger,
    ) -> Result<Option<StagingReport>, UnstageError> {
        let Some(coordinator) = self.coordinator.as_mut() else {
            if self.stager_unavailable.is_some() && !self.trigger_kinds.contains(&trigger.kind) {
                debug!(kind = %trigger.kind, "ignoring staging operation");
                return Ok(None);
            }
            let reason = self
                .stager_unavailable
                .clone()
                .unwrap_or_else(|| "no stage primitive attached".to_string());
            return Err(UnstageError::MissingDependency(reason));
        };

        Ok(coordinator.run(&self.store, source, trigger))
    }

    /// Content that a staging pass would stage for `path`
    pub fn preview(&self, source: &dyn DocumentSource, path: &str) -> Result<Vec<u8>, UnstageError> {
        let content = source.read(path)?;
        Ok(reconstruct_content(&content, &self.store.marked_rows(path)))
    }

    /// The lines of a previously reported range, for navigation
    pub fn focus_range(
        &self,
        source: &dyn DocumentSource,
        path: &str,
        range: RowRange,
    ) -> Result<Vec<FocusedLine>, UnstageError> {
        let content = source.read(path)?;
        Ok(lines_in_range(&content, range)
            .into_iter()
            .map(|(row, text)| FocusedLine {
                row,
                marked: self.store.is_marked(path, row),
                text: String::from_utf8_lossy(text)
                    .trim_end_matches(&['\r', '\n'][..])
                    .to_string(),
            })
            .collect())
    }

    /// Display tree for every marked file
    pub fn presentation(&self, numbering: LineNumbering) -> Vec<FileNode> {
        file_nodes(&self.store, numbering)
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RowStore {
        &mut self.store
    }

    pub fn into_store(self) -> RowStore {
        self.store
    }
}

/// One line returned for a navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedLine {
    pub row: Row,
    pub marked: bool,
    /// Line text without its terminator
    pub text: String,
}
