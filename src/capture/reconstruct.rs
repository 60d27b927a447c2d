//! Selective content reconstruction
//!
//! Lines keep their own terminators, so concatenating any subsequence of them
//! reproduces the original bytes of those lines exactly (`\n`, `\r\n`, and a
//! final line without terminator all survive).

use crate::core::rows::{MarkedRowSet, Row, RowRange};

/// Split content into lines, each including its `\n` terminator
pub fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    content.split_inclusive(|b| *b == b'\n').collect()
}

/// Number of lines as an editor counts them (a trailing newline opens an
/// empty last line)
pub fn line_count(content: &[u8]) -> usize {
    content.iter().filter(|b| **b == b'\n').count() + 1
}

/// Concatenate every line whose index is not marked
///
/// Marks beyond the last line never match anything and are ignored.
pub fn reconstruct(lines: &[&[u8]], marked: &MarkedRowSet) -> Vec<u8> {
    let mut staged = Vec::with_capacity(lines.iter().map(|l| l.len()).sum());
    for (index, line) in lines.iter().enumerate() {
        let excluded = Row::try_from(index).is_ok_and(|row| marked.contains(row));
        if !excluded {
            staged.extend_from_slice(line);
        }
    }
    staged
}

/// Reconstruct straight from file content
pub fn reconstruct_content(content: &[u8], marked: &MarkedRowSet) -> Vec<u8> {
    reconstruct(&split_lines(content), marked)
}

/// Count the marks that hit an existing line
pub fn excluded_line_count(lines: &[&[u8]], marked: &MarkedRowSet) -> usize {
    marked
        .iter()
        .take_while(|row| (*row as usize) < lines.len())
        .count()
}

/// The lines of `range` that exist in `content`, paired with their index
pub fn lines_in_range(content: &[u8], range: RowRange) -> Vec<(Row, &[u8])> {
    split_lines(content)
        .into_iter()
        .enumerate()
        .filter_map(|(index, line)| {
            let row = Row::try_from(index).ok()?;
            range.contains(row).then_some((row, line))
        })
        .collect()
}
