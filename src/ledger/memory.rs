//! In-memory ledger.
//!
//! Behaves like a single spreadsheet held in process memory. Used for
//! `dry_run` mode and as the backing store in tests. Formulas are stored
//! as their source text and never evaluated.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use super::{CellRange, FormatRequest, LedgerService};
use crate::error::LedgerError;
use crate::types::{InputMode, LedgerRow, SheetHandle, SheetInfo};

const LEDGER_NAME: &str = "memory";

#[derive(Debug, Clone)]
struct MemorySheet {
    info: SheetInfo,
    rows: Vec<LedgerRow>,
}

/// Sheets, values and applied formatting, all in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    sheets: Mutex<Vec<MemorySheet>>,
    formatting: Mutex<Vec<(i64, FormatRequest)>>,
    next_id: AtomicI64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a sheet pre-filled with `rows`.
    pub fn with_sheet(mut self, title: &str, rows: Vec<LedgerRow>) -> Self {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sheets.get_mut().push(MemorySheet {
            info: SheetInfo {
                title: title.to_string(),
                id,
            },
            rows,
        });
        self
    }

    /// Raw rows of a sheet exactly as stored, or `None` if it doesn't exist.
    pub async fn rows(&self, title: &str) -> Option<Vec<LedgerRow>> {
        self.sheets
            .lock()
            .await
            .iter()
            .find(|s| s.info.title == title)
            .map(|s| s.rows.clone())
    }

    /// Every formatting request applied so far, with its sheet id.
    pub async fn formatting_log(&self) -> Vec<(i64, FormatRequest)> {
        self.formatting.lock().await.clone()
    }

    fn missing_sheet(title: &str, range: &str) -> LedgerError {
        LedgerError::Api {
            status: 400,
            body: format!("Unable to parse range: {title}!{range}"),
        }
    }
}

#[async_trait]
impl LedgerService for MemoryLedger {
    async fn sheet_metadata(&self) -> Result<Vec<SheetInfo>, LedgerError> {
        Ok(self
            .sheets
            .lock()
            .await
            .iter()
            .map(|s| s.info.clone())
            .collect())
    }

    async fn create_sheet(&self, title: &str) -> Result<i64, LedgerError> {
        let mut sheets = self.sheets.lock().await;
        if sheets.iter().any(|s| s.info.title == title) {
            return Err(LedgerError::Api {
                status: 400,
                body: format!("A sheet with the name \"{title}\" already exists."),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        sheets.push(MemorySheet {
            info: SheetInfo {
                title: title.to_string(),
                id,
            },
            rows: Vec::new(),
        });
        debug!(title, id, "Memory sheet created");
        Ok(id)
    }

    async fn read_range(&self, title: &str, range: &str) -> Result<Vec<LedgerRow>, LedgerError> {
        let bounds = CellRange::parse(range)?;
        let sheets = self.sheets.lock().await;
        let sheet = sheets
            .iter()
            .find(|s| s.info.title == title)
            .ok_or_else(|| Self::missing_sheet(title, range))?;

        let first = bounds.start_row.unwrap_or(1);
        let last = bounds.end_row.unwrap_or(sheet.rows.len());

        let mut out: Vec<LedgerRow> = (first..=last)
            .map(|row| {
                let cells = sheet.rows.get(row - 1).map(Vec::as_slice).unwrap_or(&[]);
                let mut values: LedgerRow = cells
                    .iter()
                    .skip(bounds.start_col)
                    .take(bounds.width())
                    .cloned()
                    .collect();
                while values.last().is_some_and(|v| v.is_empty()) {
                    values.pop();
                }
                values
            })
            .collect();

        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn write_range(
        &self,
        title: &str,
        range: &str,
        values: Vec<LedgerRow>,
        mode: InputMode,
    ) -> Result<(), LedgerError> {
        let bounds = CellRange::parse(range)?;
        let mut sheets = self.sheets.lock().await;
        let sheet = sheets
            .iter_mut()
            .find(|s| s.info.title == title)
            .ok_or_else(|| Self::missing_sheet(title, range))?;

        let first = bounds.start_row.unwrap_or(1);
        for (offset, row_values) in values.into_iter().enumerate() {
            let index = first - 1 + offset;
            if sheet.rows.len() <= index {
                sheet.rows.resize_with(index + 1, Vec::new);
            }
            let row = &mut sheet.rows[index];
            for (col_offset, value) in row_values.into_iter().enumerate() {
                let col = bounds.start_col + col_offset;
                if row.len() <= col {
                    row.resize(col + 1, String::new());
                }
                row[col] = value;
            }
        }

        debug!(title, range, mode = mode.as_api_str(), "Memory range written");
        Ok(())
    }

    async fn insert_rows(
        &self,
        sheet: &SheetHandle,
        at: usize,
        count: usize,
    ) -> Result<(), LedgerError> {
        if at == 0 {
            return Err(LedgerError::InvalidRange(format!("row {at}")));
        }
        let mut sheets = self.sheets.lock().await;
        let target = sheets
            .iter_mut()
            .find(|s| s.info.id == sheet.id)
            .ok_or_else(|| Self::missing_sheet(&sheet.title, &format!("{at}")))?;

        // Inserting past the last row leaves nothing to shift.
        if at - 1 <= target.rows.len() {
            let tail = target.rows.split_off(at - 1);
            target.rows.extend(std::iter::repeat_with(Vec::new).take(count));
            target.rows.extend(tail);
        }
        Ok(())
    }

    async fn apply_formatting(
        &self,
        sheet: &SheetHandle,
        requests: &[FormatRequest],
    ) -> Result<(), LedgerError> {
        let mut log = self.formatting.lock().await;
        log.extend(requests.iter().cloned().map(|r| (sheet.id, r)));
        Ok(())
    }

    fn name(&self) -> &str {
        LEDGER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
