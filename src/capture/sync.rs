//! Derive edit notifications from two versions of a file
//!
//! Used when no editor reports content changes: the last reconciled snapshot
//! and the current work-tree content are diffed line by line, and every
//! changed hunk becomes one `EditDescription` expressed in the coordinates of
//! the document as it is at that point of the sequence.

use similar::{DiffTag, TextDiff};

use crate::capture::edit::EditDescription;
use crate::core::rows::Row;

/// Edits that turn `old` into `new`, in application order
pub fn derive_edits(old: &str, new: &str) -> Vec<EditDescription> {
    if old == new {
        return Vec::new();
    }

    let diff = TextDiff::from_lines(old, new);
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();

    let mut edits = Vec::new();
    // Lines inserted minus lines removed by the hunks applied so far
    let mut offset: i64 = 0;

    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            continue;
        }

        let Ok(start) = Row::try_from(old_range.start as i64 + offset) else {
            continue;
        };
        let removed = old_range.len() as Row;
        let text: String = new_lines
            .get(new_range.clone())
            .map(|lines| lines.concat())
            .unwrap_or_default();

        edits.push(EditDescription::replace_lines(start, removed, text));
        offset += new_range.len() as i64 - old_range.len() as i64;
    }

    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rows::{RowRange, Row};
    use crate::core::store::RowStore;

    fn replay(old: &str, new: &str, marks: &[Row]) -> Vec<Row> {
        let mut store = RowStore::new();
        for row in marks {
            store.add_rows("f", RowRange::single(*row));
        }
        for edit in derive_edits(old, new) {
            store.apply_edit("f", &edit);
        }
        store.marked_rows("f").to_vec()
    }

    #[test]
    fn test_identical_content_has_no_edits() {
        assert!(derive_edits("a\nb\n", "a\nb\n").is_empty());
    }

    #[test]
    fn test_insert_above_mark() {
        let old = "a\nsecret\nb\n";
        let new = "new1\nnew2\na\nsecret\nb\n";
        let edits = derive_edits(old, new);
        assert_eq!(edits, vec![EditDescription::new(0, 0, "new1\nnew2\n")]);
        assert_eq!(replay(old, new, &[1]), vec![3]);
    }

    #[test]
    fn test_delete_above_mark() {
        let old = "a\nb\nc\nsecret\n";
        let new = "a\nsecret\n";
        assert_eq!(replay(old, new, &[3]), vec![1]);
    }

    #[test]
    fn test_changes_below_mark_leave_it() {
        let old = "secret\na\nb\n";
        let new = "secret\na\nx\ny\nz\n";
        assert_eq!(replay(old, new, &[0]), vec![0]);
    }

    #[test]
    fn test_multiple_hunks_use_running_offset() {
        let old = "a\nm1\nb\nc\nm2\nd\n";
        let new = "a\nins\nm1\nb\nm2\nd\nend\n";
        // "ins" pushes m1 down, removing "c" pulls m2 back up
        assert_eq!(replay(old, new, &[1, 4]), vec![2, 4]);
    }

    #[test]
    fn test_retyped_marked_line_stays_marked() {
        let old = "a\nsecret = 1\nb\n";
        let new = "a\nsecret = 2\nb\n";
        assert_eq!(replay(old, new, &[1]), vec![1]);
    }
}
