//! Ledger wrapper for failure-path testing.
//!
//! Delegates to a `MemoryLedger` until an error is forced, after which
//! every call fails with an API error, as a quota-exhausted Sheets
//! backend would.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use betbook::error::LedgerError;
use betbook::ledger::memory::MemoryLedger;
use betbook::ledger::{FormatRequest, LedgerService};
use betbook::types::{InputMode, LedgerRow, SheetHandle, SheetInfo};

pub struct FlakyLedger {
    inner: Arc<MemoryLedger>,
    /// If set, all operations will return this error.
    force_error: Mutex<Option<String>>,
    /// Number of write calls that reached the inner ledger.
    writes: Mutex<usize>,
}

impl FlakyLedger {
    pub fn new(inner: Arc<MemoryLedger>) -> Self {
        Self {
            inner,
            force_error: Mutex::new(None),
            writes: Mutex::new(0),
        }
    }

    /// Force all subsequent operations to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    fn check(&self) -> Result<(), LedgerError> {
        match self.force_error.lock().unwrap().as_ref() {
            Some(body) => Err(LedgerError::Api {
                status: 429,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerService for FlakyLedger {
    async fn sheet_metadata(&self) -> Result<Vec<SheetInfo>, LedgerError> {
        self.check()?;
        self.inner.sheet_metadata().await
    }

    async fn create_sheet(&self, title: &str) -> Result<i64, LedgerError> {
        self.check()?;
        self.inner.create_sheet(title).await
    }

    async fn read_range(&self, title: &str, range: &str) -> Result<Vec<LedgerRow>, LedgerError> {
        self.check()?;
        self.inner.read_range(title, range).await
    }

    async fn write_range(
        &self,
        title: &str,
        range: &str,
        values: Vec<LedgerRow>,
        mode: InputMode,
    ) -> Result<(), LedgerError> {
        self.check()?;
        *self.writes.lock().unwrap() += 1;
        self.inner.write_range(title, range, values, mode).await
    }

    async fn insert_rows(
        &self,
        sheet: &SheetHandle,
        at: usize,
        count: usize,
    ) -> Result<(), LedgerError> {
        self.check()?;
        self.inner.insert_rows(sheet, at, count).await
    }

    async fn apply_formatting(
        &self,
        sheet: &SheetHandle,
        requests: &[FormatRequest],
    ) -> Result<(), LedgerError> {
        self.check()?;
        self.inner.apply_formatting(sheet, requests).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}
