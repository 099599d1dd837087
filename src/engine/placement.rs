//! Row placement.
//!
//! Decides where a new bet lands in a month sheet. Bets on the same match
//! are kept together inside the current week segment (the rows after the
//! last "End of Week" marker); anything else is appended.

use crate::types::{BetRecord, Column, LedgerRow};

/// Prefix (case-insensitive) identifying a week-marker row.
pub const WEEK_MARKER_PREFIX: &str = "end of";

/// Target row for a new bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// 1-based row to write.
    pub row: usize,
    /// Whether an empty row must be inserted at `row` before writing.
    pub insert: bool,
}

/// Whether `row` is a week marker.
pub fn is_week_marker(row: &LedgerRow) -> bool {
    row.first().is_some_and(|cell| {
        cell.get(..WEEK_MARKER_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(WEEK_MARKER_PREFIX))
    })
}

/// 1-based index of the last week marker, or 0 when there is none.
pub fn week_boundary(rows: &[LedgerRow]) -> usize {
    rows.iter()
        .rposition(is_week_marker)
        .map(|i| i + 1)
        .unwrap_or(0)
}

fn mentions_match(row: &LedgerRow, match_label: &str) -> bool {
    row.get(Column::Match.index())
        .is_some_and(|cell| cell.contains(match_label))
}

/// Resolve the placement of `bet` among the existing `rows`.
///
/// Only rows after the last week marker are searched. A regular bet goes
/// right after the last row mentioning its match, shifting the rows below.
/// A total bet takes the first row mentioning its match and overwrites it
/// in place. Without a match the bet is appended after the last row.
pub fn resolve_placement(rows: &[LedgerRow], bet: &BetRecord) -> Placement {
    let boundary = week_boundary(rows);
    let mut target = rows.len() + 1;

    for (offset, row) in rows.iter().enumerate().skip(boundary) {
        if !mentions_match(row, &bet.match_label) {
            continue;
        }
        let index = offset + 1;
        if bet.is_total {
            target = index;
            break;
        }
        target = index + 1;
    }

    Placement {
        row: target,
        insert: !bet.is_total && target <= rows.len(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
