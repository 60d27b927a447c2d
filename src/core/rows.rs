use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::UnstageError;

/// Zero-based line index
pub type Row = u32;

/// The set of marked (excluded) rows of one file
///
/// Set semantics: no duplicates, iteration is ascending. An empty set is
/// equivalent to "no marks" everywhere except persistence bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkedRowSet {
    rows: BTreeSet<Row>,
}

impl MarkedRowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every row in the range, returning how many were newly marked
    pub fn insert_range(&mut self, range: RowRange) -> usize {
        range.rows().filter(|row| self.rows.insert(*row)).count()
    }

    /// Unmark every row in the range, returning how many were marked before
    pub fn remove_range(&mut self, range: RowRange) -> usize {
        let hit: Vec<Row> = self.rows.range(range.rows()).copied().collect();
        for row in &hit {
            self.rows.remove(row);
        }
        hit.len()
    }

    pub fn contains(&self, row: Row) -> bool {
        self.rows.contains(&row)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Row> + '_ {
        self.rows.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Row> {
        self.iter().collect()
    }

    /// Maximal runs of consecutive rows
    pub fn ranges(&self) -> Vec<RowRange> {
        merge_rows(self.iter())
    }
}

impl FromIterator<Row> for MarkedRowSet {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// An inclusive run of rows `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowRange {
    pub start: Row,
    pub end: Row,
}

impl RowRange {
    /// Create a validated range; `start` must not be after `end`
    pub fn new(start: Row, end: Row) -> Result<Self, UnstageError> {
        if start > end {
            return Err(UnstageError::InvalidRange {
                start: u64::from(start),
                end: u64::from(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn single(row: Row) -> Self {
        Self {
            start: row,
            end: row,
        }
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, row: Row) -> bool {
        self.start <= row && row <= self.end
    }

    pub fn rows(&self) -> RangeInclusive<Row> {
        self.start..=self.end
    }

    /// The part of this range that lies inside a document of `line_count`
    /// lines, or `None` if it starts past the end
    pub fn clamp_to(self, line_count: usize) -> Option<Self> {
        let last = Row::try_from(line_count.checked_sub(1)?).unwrap_or(Row::MAX);
        if self.start > last {
            return None;
        }
        Some(Self {
            start: self.start,
            end: self.end.min(last),
        })
    }

    /// Parse a 1-based, inclusive line selection (`N`, `N..M` or `N-M`)
    /// into a zero-based range
    pub fn parse_one_based(input: &str) -> Result<Self, UnstageError> {
        let invalid = || UnstageError::InvalidSelection(input.to_string());
        let trimmed = input.trim();

        let (first, last) = match trimmed.split_once("..").or_else(|| trimmed.split_once('-')) {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (trimmed, trimmed),
        };

        let first: Row = first.parse().map_err(|_| invalid())?;
        let last: Row = last.parse().map_err(|_| invalid())?;
        if first == 0 || last == 0 {
            return Err(invalid());
        }

        Self::new(first - 1, last - 1)
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// Coalesce rows into sorted, maximal, non-adjacent ranges
pub fn merge_rows<I: IntoIterator<Item = Row>>(rows: I) -> Vec<RowRange> {
    let mut sorted: Vec<Row> = rows.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<RowRange> = Vec::new();
    for row in sorted {
        match ranges.last_mut() {
            Some(last) if last.end.checked_add(1) == Some(row) => last.end = row,
            _ => ranges.push(RowRange::single(row)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_rows() {
        let ranges = merge_rows([1, 2, 3, 7, 8, 10]);
        assert_eq!(
            ranges,
            vec![
                RowRange { start: 1, end: 3 },
                RowRange { start: 7, end: 8 },
                RowRange { start: 10, end: 10 },
            ]
        );
    }

    #[test]
    fn test_merge_rows_unsorted_with_duplicates() {
        let ranges = merge_rows([8, 3, 2, 3, 1, 7]);
        assert_eq!(
            ranges,
            vec![RowRange { start: 1, end: 3 }, RowRange { start: 7, end: 8 }]
        );
        assert!(merge_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_row_range_rejects_reversed() {
        assert!(RowRange::new(3, 5).is_ok());
        assert!(RowRange::new(5, 5).is_ok());
        assert!(matches!(
            RowRange::new(6, 5),
            Err(UnstageError::InvalidRange { start: 6, end: 5 })
        ));
    }

    #[test]
    fn test_parse_one_based() {
        assert_eq!(RowRange::parse_one_based("4").unwrap(), RowRange::single(3));
        assert_eq!(
            RowRange::parse_one_based("4..6").unwrap(),
            RowRange { start: 3, end: 5 }
        );
        assert_eq!(
            RowRange::parse_one_based(" 1-2 ").unwrap(),
            RowRange { start: 0, end: 1 }
        );
    }

    #[test]
    fn test_parse_one_based_invalid() {
        assert!(RowRange::parse_one_based("0").is_err());
        assert!(RowRange::parse_one_based("abc").is_err());
        assert!(RowRange::parse_one_based("-3").is_err());
        assert!(matches!(
            RowRange::parse_one_based("6..4"),
            Err(UnstageError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_marked_row_set_counts() {
        let mut rows = MarkedRowSet::new();
        assert_eq!(rows.insert_range(RowRange { start: 3, end: 5 }), 3);
        assert_eq!(rows.insert_range(RowRange { start: 4, end: 6 }), 1);
        assert_eq!(rows.remove_range(RowRange { start: 0, end: 3 }), 1);
        assert_eq!(rows.to_vec(), vec![4, 5, 6]);
        assert_eq!(rows.ranges(), vec![RowRange { start: 4, end: 6 }]);
    }

    #[test]
    fn test_display() {
        assert_eq!(RowRange::single(4).to_string(), "4");
        assert_eq!(RowRange { start: 1, end: 3 }.to_string(), "1..3");
    }

    #[test]
    fn test_clamp_to_document() {
        let huge = RowRange::parse_one_based("1..4294967295").unwrap();
        assert_eq!(huge.clamp_to(3), Some(RowRange { start: 0, end: 2 }));
        assert_eq!(RowRange::single(1).clamp_to(3), Some(RowRange::single(1)));
        assert_eq!(RowRange::single(3).clamp_to(3), None);
        assert_eq!(RowRange::single(0).clamp_to(0), None);
    }

    #[test]
    fn test_remove_huge_range_only_touches_marks() {
        let mut rows: MarkedRowSet = [2, 7].into_iter().collect();
        assert_eq!(rows.remove_range(RowRange { start: 0, end: Row::MAX }), 2);
        assert!(rows.is_empty());
    }
}
