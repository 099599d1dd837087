//! Ledger service integrations.
//!
//! Defines the `LedgerService` trait and provides implementations for:
//! - Google Sheets, authenticated with a service account
//! - In-memory, for dry runs and tests
//!
//! Ranges are A1 notation relative to a sheet (`A:K`, `A1:K1`, `G12:K12`).

pub mod auth;
pub mod memory;
pub mod sheets;

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::types::{Column, InputMode, LedgerRow, Outcome, SheetHandle, SheetInfo};

/// Abstraction over spreadsheet-like ledgers.
///
/// Rows are 1-based. Reads behave like the Sheets values API: trailing
/// empty rows and trailing empty cells are omitted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// List the worksheets of the ledger.
    async fn sheet_metadata(&self) -> Result<Vec<SheetInfo>, LedgerError>;

    /// Create a worksheet and return its id.
    async fn create_sheet(&self, title: &str) -> Result<i64, LedgerError>;

    /// Read the values of `range` on sheet `title`.
    async fn read_range(&self, title: &str, range: &str) -> Result<Vec<LedgerRow>, LedgerError>;

    /// Write `values` starting at the top-left cell of `range`.
    async fn write_range(
        &self,
        title: &str,
        range: &str,
        values: Vec<LedgerRow>,
        mode: InputMode,
    ) -> Result<(), LedgerError>;

    /// Insert `count` empty rows at 1-based row `at`, shifting rows at or
    /// below it down.
    async fn insert_rows(&self, sheet: &SheetHandle, at: usize, count: usize)
        -> Result<(), LedgerError>;

    /// Apply cosmetic formatting. Not part of the bookkeeping semantics.
    async fn apply_formatting(
        &self,
        sheet: &SheetHandle,
        requests: &[FormatRequest],
    ) -> Result<(), LedgerError>;

    /// Ledger name for logging and identification.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Formatting requests
// ---------------------------------------------------------------------------

/// RGB colour, channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rgb {
    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }
}

pub const HEADER_BACKGROUND: Rgb = Rgb::new(1.0, 0.8, 0.6);
pub const MARKER_BACKGROUND: Rgb = Rgb::new(1.0, 0.8, 0.8);
pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

impl Outcome {
    /// Background used to highlight a settled bet.
    pub fn highlight(&self) -> Rgb {
        match self {
            Outcome::Win => Rgb::new(0.0, 0.6, 0.0),
            Outcome::Lose => Rgb::new(1.0, 0.0, 0.0),
            Outcome::Draw => Rgb::new(0.0, 0.0, 1.0),
        }
    }
}

/// Cosmetic instructions understood by every ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatRequest {
    /// Bold header row across all columns.
    HeaderStyle { row: usize },
    /// Tinted week-marker row across all columns.
    MarkerStyle { row: usize },
    /// WIN/LOSE/DRAW dropdown on the Win/Lose column.
    OutcomeValidation { first_row: usize, last_row: usize },
    /// Conditional highlight of one outcome in the Win/Lose column.
    OutcomeHighlight {
        outcome: Outcome,
        first_row: usize,
        last_row: usize,
        priority: usize,
    },
}

/// Formatting applied once to a freshly initialised month sheet.
pub fn sheet_setup_formatting(validation_rows: usize) -> Vec<FormatRequest> {
    let mut requests = vec![
        FormatRequest::OutcomeValidation {
            first_row: 2,
            last_row: validation_rows,
        },
        FormatRequest::HeaderStyle { row: 1 },
    ];
    requests.extend(Outcome::ALL.iter().enumerate().map(|(priority, outcome)| {
        FormatRequest::OutcomeHighlight {
            outcome: *outcome,
            first_row: 2,
            last_row: validation_rows,
            priority,
        }
    }));
    requests
}

// ---------------------------------------------------------------------------
// A1 ranges
// ---------------------------------------------------------------------------

/// A parsed A1 range. Columns are zero-based, rows 1-based; open rows
/// (`A:K`) have no row bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_col: usize,
    pub start_row: Option<usize>,
    pub end_col: usize,
    pub end_row: Option<usize>,
}

impl CellRange {
    /// Parse `A5`, `A1:K1` or `A:K`.
    pub fn parse(range: &str) -> Result<Self, LedgerError> {
        let (start, end) = range.split_once(':').unwrap_or((range, range));
        let (start_col, start_row) = parse_cell(start)
            .ok_or_else(|| LedgerError::InvalidRange(range.to_string()))?;
        let (end_col, end_row) =
            parse_cell(end).ok_or_else(|| LedgerError::InvalidRange(range.to_string()))?;

        if end_col < start_col {
            return Err(LedgerError::InvalidRange(range.to_string()));
        }
        if let (Some(s), Some(e)) = (start_row, end_row) {
            if e < s {
                return Err(LedgerError::InvalidRange(range.to_string()));
            }
        }

        Ok(Self {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    pub fn width(&self) -> usize {
        self.end_col - self.start_col + 1
    }
}

/// `"K12"` to `(10, Some(12))`, `"K"` to `(10, None)`.
fn parse_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let split = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
        - 1;

    let row = if digits.is_empty() {
        None
    } else {
        match digits.parse::<usize>() {
            Ok(0) | Err(_) => return None,
            Ok(r) => Some(r),
        }
    };

    Some((col, row))
}

/// Whole-column range over every ledger column: `A:K`.
pub fn all_columns() -> String {
    format!("{}:{}", Column::Date.letter(), Column::Commission.letter())
}

/// Range covering columns `first..=last` on one row, e.g. `G12:K12`.
pub fn row_span(first: Column, last: Column, row: usize) -> String {
    format!("{}:{}", first.cell(row), last.cell(row))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
