//! Derived-column formulas.
//!
//! The sheet recomputes profit and payout whenever someone edits the
//! Win/Lose column, so we write spreadsheet formulas rather than values.
//! The exact text is a contract with the existing month sheets.

use crate::config::BookConfig;
use crate::types::{Column, LedgerRow};

/// Formulas for the derived columns of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFormulas {
    /// Outcome $: payout on WIN, lost stake on LOSE, 0 otherwise.
    pub outcome: String,
    /// Profit from the correct odds over the listed odds.
    pub profit: String,
    pub peso: String,
    /// Commission owed on the commission platform, blank elsewhere.
    pub commission: String,
}

impl RowFormulas {
    /// Cells for columns G..=K. The Win/Lose cell is left blank for the
    /// operator to fill in.
    pub fn derived_cells(&self) -> LedgerRow {
        vec![
            self.profit.clone(),
            String::new(),
            self.outcome.clone(),
            self.peso.clone(),
            self.commission.clone(),
        ]
    }
}

/// Build the formulas for 1-based `row`.
pub fn generate_formulas(row: usize, book: &BookConfig) -> RowFormulas {
    let amount = Column::Amount.cell(row);
    let platform = Column::Platform.cell(row);
    let odds = Column::Odds.cell(row);
    let correct = Column::CorrectOdds.cell(row);
    let result = Column::WinLose.cell(row);
    let outcome_cell = Column::OutcomeAmount.cell(row);
    let sentinel = &book.commission_platform;
    let rate = book.peso_rate;

    RowFormulas {
        outcome: format!(
            "=IF({result}=\"WIN\", {amount}*{odds}, IF({result}=\"LOSE\", -{amount}, 0))"
        ),
        profit: format!(
            "=IF(AND({result}=\"WIN\", {platform}<>\"{sentinel}\"), \
             TEXT({amount} * {correct} - {amount} * {odds}, \"#,##0\"), \"0\")"
        ),
        peso: format!("=TEXT({outcome_cell} * {rate}, \"#,##0\")"),
        commission: format!(
            "=IF({platform}=\"{sentinel}\", TEXT({amount} * {rate} * {}, \"#,##0.00\"), \"\")",
            book.commission_rate
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
