use std::collections::BTreeMap;

use tracing::debug;

use crate::capture::edit::{adjust_rows, EditDescription};
use crate::core::rows::{MarkedRowSet, Row, RowRange};

/// Per-file marked rows for one project
///
/// Paths are the map keys; a path never has two independent sets. Sets are
/// created lazily on the first mark and are kept (possibly empty) afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowStore {
    files: BTreeMap<String, MarkedRowSet>,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every row of `range` for `path`, returning how many were newly marked
    pub fn add_rows(&mut self, path: &str, range: RowRange) -> usize {
        self.files
            .entry(path.to_string())
            .or_default()
            .insert_range(range)
    }

    /// Unmark every row of `range` for `path`; rows not marked are ignored
    pub fn remove_rows(&mut self, path: &str, range: RowRange) -> usize {
        match self.files.get_mut(path) {
            Some(rows) => rows.remove_range(range),
            None => 0,
        }
    }

    /// Current marks for `path` (empty when none)
    pub fn marked_rows(&self, path: &str) -> MarkedRowSet {
        self.files.get(path).cloned().unwrap_or_default()
    }

    /// Borrow the marks for `path` without copying
    pub fn rows(&self, path: &str) -> Option<&MarkedRowSet> {
        self.files.get(path)
    }

    /// Merged ranges for `path`, ascending and maximal
    pub fn merged_ranges(&self, path: &str) -> Vec<RowRange> {
        self.files
            .get(path)
            .map(MarkedRowSet::ranges)
            .unwrap_or_default()
    }

    pub fn is_marked(&self, path: &str, row: Row) -> bool {
        self.files.get(path).is_some_and(|rows| rows.contains(row))
    }

    /// Install a complete new set for `path` in one step
    pub fn replace_rows(&mut self, path: &str, rows: MarkedRowSet) {
        self.files.insert(path.to_string(), rows);
    }

    /// Re-anchor the marks of `path` after an edit
    ///
    /// Returns whether the marks changed.
    pub fn apply_edit(&mut self, path: &str, edit: &EditDescription) -> bool {
        let Some(current) = self.files.get(path) else {
            return false;
        };

        match adjust_rows(current, edit) {
            Some(adjusted) if adjusted != *current => {
                debug!(
                    path,
                    delta = edit.line_delta(),
                    before = current.len(),
                    after = adjusted.len(),
                    "re-anchored marks"
                );
                self.replace_rows(path, adjusted);
                true
            }
            _ => false,
        }
    }

    /// Drop all marks for `path`, returning how many there were
    pub fn clear_path(&mut self, path: &str) -> usize {
        self.files.remove(path).map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Paths with at least one mark, in path order
    pub fn marked_paths(&self) -> Vec<&str> {
        self.iter().map(|(path, _)| path).collect()
    }

    /// Non-empty sets in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MarkedRowSet)> {
        self.files
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(path, rows)| (path.as_str(), rows))
    }

    /// Total number of marked rows across all files
    pub fn total_rows(&self) -> usize {
        self.files.values().map(MarkedRowSet::len).sum()
    }

    pub fn has_marks(&self) -> bool {
        self.files.values().any(|rows| !rows.is_empty())
    }

    /// Non-empty sets as plain sequences, the persisted shape
    pub fn to_map(&self) -> BTreeMap<String, Vec<Row>> {
        self.iter()
            .map(|(path, rows)| (path.to_string(), rows.to_vec()))
            .collect()
    }
}

impl FromIterator<(String, MarkedRowSet)> for RowStore {
    fn from_iter<I: IntoIterator<Item = (String, MarkedRowSet)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
