//! Display items derived from the row store
//!
//! Everything here is recomputed from `RowStore` on demand and holds no state
//! of its own.

use std::path::Path;

use serde::Serialize;

use crate::core::rows::RowRange;
use crate::core::store::RowStore;

/// How line numbers are shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineNumbering {
    /// Editor-style numbering starting at 1
    #[default]
    OneBased,
    /// Raw zero-based row indices
    ZeroBased,
}

impl LineNumbering {
    pub fn from_one_based(one_based: bool) -> Self {
        if one_based {
            Self::OneBased
        } else {
            Self::ZeroBased
        }
    }

    fn offset(self) -> u64 {
        match self {
            Self::OneBased => 1,
            Self::ZeroBased => 0,
        }
    }

    /// Format a single zero-based row
    pub fn line(self, row: u32) -> u64 {
        u64::from(row) + self.offset()
    }
}

/// One merged range under a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeItem {
    /// Zero-based range, usable for navigation
    pub range: RowRange,
    pub label: String,
}

/// A file with at least one mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub path: String,
    /// File name for compact display
    pub label: String,
    pub line_count: usize,
    pub ranges: Vec<RangeItem>,
}

/// Label for a range, e.g. `line 4` or `lines 4-6`
pub fn range_label(range: RowRange, numbering: LineNumbering) -> String {
    if range.is_single() {
        format!("line {}", numbering.line(range.start))
    } else {
        format!(
            "lines {}-{}",
            numbering.line(range.start),
            numbering.line(range.end)
        )
    }
}

/// File nodes for every path with marks, ordered by path
pub fn file_nodes(store: &RowStore, numbering: LineNumbering) -> Vec<FileNode> {
    store
        .iter()
        .map(|(path, rows)| FileNode {
            path: path.to_string(),
            label: file_label(path),
            line_count: rows.len(),
            ranges: rows
                .ranges()
                .into_iter()
                .map(|range| RangeItem {
                    range,
                    label: range_label(range, numbering),
                })
                .collect(),
        })
        .collect()
}

/// The node for one path, if it has marks
pub fn file_node(store: &RowStore, path: &str, numbering: LineNumbering) -> Option<FileNode> {
    file_nodes(store, numbering)
        .into_iter()
        .find(|node| node.path == path)
}

fn file_label(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}
