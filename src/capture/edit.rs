use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::rows::{MarkedRowSet, Row};
use crate::error::UnstageError;

/// One document mutation: the lines `start_line..=end_line` (by position of
/// the replaced range's start and end) replaced with `inserted_text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDescription {
    /// Line of the replaced range's start
    pub start_line: Row,
    /// Line of the replaced range's end
    pub end_line: Row,
    /// Replacement text
    #[serde(default)]
    pub inserted_text: String,
}

impl EditDescription {
    pub fn new(start_line: Row, end_line: Row, inserted_text: impl Into<String>) -> Self {
        Self {
            start_line,
            end_line,
            inserted_text: inserted_text.into(),
        }
    }

    /// Insert text at the start of line `at`
    pub fn insert_lines(at: Row, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    /// Delete the whole lines `first..=last`
    pub fn delete_lines(first: Row, last: Row) -> Self {
        Self::new(first, last.saturating_add(1), "")
    }

    /// Replace `count` whole lines starting at `first` with `text`
    pub fn replace_lines(first: Row, count: Row, text: impl Into<String>) -> Self {
        Self::new(first, first.saturating_add(count), text)
    }

    /// Number of line terminators in the inserted text
    pub fn inserted_line_count(&self) -> i64 {
        self.inserted_text.bytes().filter(|b| *b == b'\n').count() as i64
    }

    /// Net change in line count
    pub fn line_delta(&self) -> i64 {
        self.inserted_line_count() - (i64::from(self.end_line) - i64::from(self.start_line))
    }
}

/// A position as an editor reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPosition {
    pub line: Row,
    #[serde(default)]
    pub character: u32,
}

/// A range as an editor reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

/// Editor-style content change notification
///
/// A change without a range replaces the whole document and cannot be
/// mapped to a line edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    #[serde(default)]
    pub range: Option<TextRange>,
    pub text: String,
}

impl TryFrom<ContentChange> for EditDescription {
    type Error = UnstageError;

    fn try_from(change: ContentChange) -> Result<Self, Self::Error> {
        let range = change.range.ok_or_else(|| {
            UnstageError::UnsupportedEdit("full document replacement has no line range".into())
        })?;

        let (start, end) = (range.start, range.end);
        if (start.line, start.character) > (end.line, end.character) {
            return Err(UnstageError::InvalidRange {
                start: u64::from(start.line),
                end: u64::from(end.line),
            });
        }

        Ok(Self::new(start.line, end.line, change.text))
    }
}

/// Compute the marks that denote the same logical lines after `edit`
///
/// Returns `None` when the set does not change: no marks, or an edit that
/// keeps the line count. Marks before the edit's end line stay put, marks at
/// or after it move by the line delta, and marks that would leave the row
/// domain are dropped.
pub fn adjust_rows(rows: &MarkedRowSet, edit: &EditDescription) -> Option<MarkedRowSet> {
    if rows.is_empty() {
        return None;
    }

    let delta = edit.line_delta();
    if delta == 0 {
        return None;
    }

    let adjusted: MarkedRowSet = rows
        .iter()
        .filter_map(|row| {
            if row < edit.end_line {
                return Some(row);
            }
            let shifted = i64::from(row) + delta;
            match Row::try_from(shifted) {
                Ok(row) => Some(row),
                Err(_) => {
                    debug!(row, delta, "dropping mark shifted out of range");
                    None
                }
            }
        })
        .collect();

    Some(adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[Row]) -> MarkedRowSet {
        values.iter().copied().collect()
    }

    fn adjusted(values: &[Row], edit: &EditDescription) -> Vec<Row> {
        let original = rows(values);
        adjust_rows(&original, edit)
            .unwrap_or(original)
            .to_vec()
    }

    #[test]
    fn test_insert_above_shifts_mark() {
        let edit = EditDescription::new(2, 2, "first\nsecond\n");
        assert_eq!(edit.line_delta(), 2);
        assert_eq!(adjusted(&[10], &edit), vec![12]);
    }

    #[test]
    fn test_delete_above_shifts_mark() {
        let edit = EditDescription::delete_lines(2, 4);
        assert_eq!(edit.line_delta(), -3);
        assert_eq!(adjusted(&[10], &edit), vec![7]);

        // Two lines removed above the mark
        let edit = EditDescription::new(2, 4, "");
        assert_eq!(adjusted(&[10], &edit), vec![8]);
    }

    #[test]
    fn test_boundary_mark_shifts() {
        let edit = EditDescription::insert_lines(5, "new line\n");
        assert_eq!(adjusted(&[5], &edit), vec![6]);
    }

    #[test]
    fn test_marks_before_edit_unchanged() {
        let edit = EditDescription::insert_lines(5, "a\nb\nc\n");
        assert_eq!(adjusted(&[0, 4, 5, 9], &edit), vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_line_neutral_edit_is_noop() {
        let marks = rows(&[1, 5, 9]);
        let retyped = EditDescription::new(5, 5, "completely different");
        assert_eq!(retyped.line_delta(), 0);
        assert!(adjust_rows(&marks, &retyped).is_none());

        // Two lines rewritten as two other lines
        let balanced = EditDescription::new(3, 4, "x\ny");
        assert_eq!(balanced.line_delta(), 0);
        assert!(adjust_rows(&marks, &balanced).is_none());
    }

    #[test]
    fn test_marks_inside_replaced_range_kept() {
        // Lines 2..5 collapsed into one line; marks at 3 and 4 stay put
        let edit = EditDescription::new(2, 5, "merged");
        assert_eq!(edit.line_delta(), -3);
        assert_eq!(adjusted(&[3, 4, 5, 8], &edit), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_whole_block_deleted_collapses_onto_start() {
        let edit = EditDescription::new(0, 1, "");
        let marks = rows(&[0, 1, 3]);
        assert_eq!(adjust_rows(&marks, &edit).unwrap().to_vec(), vec![0, 2]);

        let edit = EditDescription::new(0, 10, "");
        assert_eq!(adjusted(&[10, 12], &edit), vec![0, 2]);
    }

    #[test]
    fn test_marks_shifted_out_of_range_dropped() {
        let edit = EditDescription::insert_lines(0, "a\nb\n");
        assert_eq!(adjusted(&[1, Row::MAX - 1], &edit), vec![3]);
    }

    #[test]
    fn test_empty_set_fast_path() {
        let edit = EditDescription::insert_lines(0, "\n\n");
        assert!(adjust_rows(&MarkedRowSet::new(), &edit).is_none());
    }

    #[test]
    fn test_crlf_counts_once() {
        let edit = EditDescription::insert_lines(0, "a\r\nb\r\n");
        assert_eq!(edit.line_delta(), 2);
    }

    #[test]
    fn test_content_change_conversion() {
        let json = r#"{
            "range": {"start": {"line": 2, "character": 4}, "end": {"line": 2, "character": 4}},
            "text": "\n\n"
        }"#;
        let change: ContentChange = serde_json::from_str(json).unwrap();
        let edit = EditDescription::try_from(change).unwrap();
        assert_eq!(edit, EditDescription::new(2, 2, "\n\n"));
        assert_eq!(edit.line_delta(), 2);
    }

    #[test]
    fn test_content_change_rejects_full_replace_and_reversed() {
        let full = ContentChange {
            range: None,
            text: "everything".into(),
        };
        assert!(matches!(
            EditDescription::try_from(full),
            Err(UnstageError::UnsupportedEdit(_))
        ));

        let reversed = ContentChange {
            range: Some(TextRange {
                start: TextPosition { line: 4, character: 0 },
                end: TextPosition { line: 2, character: 0 },
            }),
            text: String::new(),
        };
        assert!(matches!(
            EditDescription::try_from(reversed),
            Err(UnstageError::InvalidRange { .. })
        ));
    }
}
