//! Writes bets and week markers into the month sheet.
//!
//! Each mutating operation reads the sheet, decides a row and then writes.
//! One async mutex serialises these sequences per recorder.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::formulas::generate_formulas;
use super::placement::{resolve_placement, Placement};
use crate::config::BookConfig;
use crate::error::{BookError, LedgerError};
use crate::ledger::{all_columns, row_span, sheet_setup_formatting, FormatRequest, LedgerService};
use crate::parser::parse_bet;
use crate::types::{header_row, BetRecord, Column, InputMode, SheetHandle};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A bet that has been written to the ledger.
#[derive(Debug, Clone)]
pub struct RecordedBet {
    pub bet: BetRecord,
    pub sheet: String,
    pub placement: Placement,
}

/// Rows written by an end-of-week command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekMarker {
    pub marker_row: usize,
    pub header_row: usize,
}

/// Worksheet title for the month containing `date`, e.g. `October`.
pub fn sheet_title(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

pub struct BetRecorder {
    ledger: Arc<dyn LedgerService>,
    book: BookConfig,
    /// Sheets already checked for headers and formatting in this process.
    sheets: Mutex<HashMap<String, SheetHandle>>,
    /// Held for the whole of each read-modify-write sequence.
    write_lock: Mutex<()>,
}

impl BetRecorder {
    pub fn new(ledger: Arc<dyn LedgerService>, book: BookConfig) -> Self {
        Self {
            ledger,
            book,
            sheets: Mutex::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn ledger_name(&self) -> &str {
        self.ledger.name()
    }

    /// Parse a `/bet` message and record it on the sheet for `date`.
    pub async fn submit_bet(&self, text: &str, date: NaiveDate) -> Result<RecordedBet, BookError> {
        let bet = parse_bet(text, date)?;
        debug!(bet = %bet, "Bet parsed");
        Ok(self.record_bet(bet).await?)
    }

    /// Write `bet` to its month sheet at the resolved placement, followed
    /// by the derived-column formulas.
    pub async fn record_bet(&self, bet: BetRecord) -> Result<RecordedBet, LedgerError> {
        let _guard = self.write_lock.lock().await;

        let title = sheet_title(bet.date);
        let sheet = self.ensure_sheet(&title).await?;

        let rows = self.ledger.read_range(&title, &all_columns()).await?;
        let placement = resolve_placement(&rows, &bet);
        debug!(
            match_label = %bet.match_label,
            existing_rows = rows.len(),
            row = placement.row,
            insert = placement.insert,
            "Placement resolved"
        );

        if placement.insert {
            self.ledger.insert_rows(&sheet, placement.row, 1).await?;
        }

        let row = placement.row;
        self.ledger
            .write_range(
                &title,
                &row_span(Column::Date, Column::CorrectOdds, row),
                vec![bet.ledger_cells()],
                InputMode::Raw,
            )
            .await?;

        let formulas = generate_formulas(row, &self.book);
        self.ledger
            .write_range(
                &title,
                &row_span(Column::Profit, Column::Commission, row),
                vec![formulas.derived_cells()],
                InputMode::UserEntered,
            )
            .await?;

        info!(
            sheet = %title,
            row,
            inserted = placement.insert,
            total = bet.is_total,
            amount = %bet.stake_display(),
            currency = %bet.currency,
            "Bet saved"
        );

        Ok(RecordedBet {
            bet,
            sheet: title,
            placement,
        })
    }

    /// Append a week-marker row followed by a fresh header row.
    ///
    /// Not idempotent: every call adds another marker.
    pub async fn mark_end_of_week(&self, date: NaiveDate) -> Result<WeekMarker, LedgerError> {
        let _guard = self.write_lock.lock().await;

        let title = sheet_title(date);
        let sheet = self.ensure_sheet(&title).await?;

        let rows = self.ledger.read_range(&title, &all_columns()).await?;
        let marker_row = rows.len() + 1;
        let header_row_index = marker_row + 1;

        self.ledger.insert_rows(&sheet, marker_row, 1).await?;
        self.ledger
            .write_range(
                &title,
                &Column::Date.cell(marker_row),
                vec![vec![self.book.week_marker_label.clone()]],
                InputMode::Raw,
            )
            .await?;
        self.ledger
            .write_range(
                &title,
                &row_span(Column::Date, Column::Commission, header_row_index),
                vec![header_row()],
                InputMode::Raw,
            )
            .await?;
        self.ledger
            .apply_formatting(
                &sheet,
                &[
                    FormatRequest::MarkerStyle { row: marker_row },
                    FormatRequest::HeaderStyle { row: header_row_index },
                ],
            )
            .await?;

        info!(sheet = %title, marker_row, "End of week marker and headers added");

        Ok(WeekMarker {
            marker_row,
            header_row: header_row_index,
        })
    }

    /// Make sure the month sheet exists and has its header row.
    ///
    /// Formatting is applied only when the sheet or its header had to be
    /// created. Checked sheets are cached for the life of the recorder.
    pub async fn ensure_sheet(&self, title: &str) -> Result<SheetHandle, LedgerError> {
        let mut cache = self.sheets.lock().await;
        if let Some(handle) = cache.get(title) {
            return Ok(handle.clone());
        }

        let existing = self
            .ledger
            .sheet_metadata()
            .await?
            .into_iter()
            .find(|s| s.title == title);

        let (handle, created) = match existing {
            Some(info) => (SheetHandle::from(info), false),
            None => {
                let id = self.ledger.create_sheet(title).await?;
                info!(sheet = %title, id, "New month sheet created");
                (
                    SheetHandle {
                        title: title.to_string(),
                        id,
                    },
                    true,
                )
            }
        };

        let header_range = row_span(Column::Date, Column::Commission, 1);
        let header_missing = self.ledger.read_range(title, &header_range).await?.is_empty();
        if header_missing {
            self.ledger
                .write_range(title, &header_range, vec![header_row()], InputMode::Raw)
                .await?;
            info!(sheet = %title, "Headers added");
        }

        if created || header_missing {
            self.ledger
                .apply_formatting(&handle, &sheet_setup_formatting(self.book.validation_rows))
                .await?;
        }

        cache.insert(title.to_string(), handle.clone());
        Ok(handle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryLedger;
    use crate::ledger::MockLedgerService;
    use crate::types::{LedgerRow, SheetInfo};

    fn october() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn recorder_with(ledger: Arc<MemoryLedger>) -> BetRecorder {
        BetRecorder::new(ledger, BookConfig::default())
    }

    fn match_column(rows: &[LedgerRow]) -> Vec<String> {
        rows.iter()
            .map(|r| r.get(1).cloned().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_sheet_title() {
        assert_eq!(sheet_title(october()), "October");
        assert_eq!(sheet_title(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()), "January");
    }

    #[tokio::test]
    async fn test_first_bet_initialises_sheet() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = recorder_with(ledger.clone());

        let recorded = recorder
            .submit_bet("/bet Bet365 TeamA/TeamB 1h o2.5 @1.85 5k USD", october())
            .await
            .unwrap();
        assert_eq!(recorded.sheet, "October");
        assert_eq!(recorded.placement, Placement { row: 2, insert: false });

        let rows = ledger.rows("October").await.unwrap();
        assert_eq!(rows[0], header_row());
        assert_eq!(&rows[1][..6], &[
            "2026-10-16",
            "Bet365 TeamA/TeamB 1h o2.5 @1.85 5k USD",
            "5,000",
            "BET365",
            "1.85",
            "0",
        ]);
        assert_eq!(rows[1][6], generate_formulas(2, &BookConfig::default()).profit);
        assert_eq!(rows[1][7], "");
        assert!(rows[1][10].contains("C2 * 60 * 0.02"));

        // validation + header style + three highlights
        assert_eq!(ledger.formatting_log().await.len(), 5);
    }

    #[tokio::test]
    async fn test_setup_formatting_applied_once() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = recorder_with(ledger.clone());

        recorder.submit_bet("bet A Foo/Bar @2 1k", october()).await.unwrap();
        recorder.submit_bet("bet B Baz/Qux @2 1k", october()).await.unwrap();

        assert_eq!(ledger.formatting_log().await.len(), 5);
    }

    #[tokio::test]
    async fn test_existing_sheet_with_headers_is_not_reformatted() {
        let ledger = Arc::new(MemoryLedger::new().with_sheet("October", vec![header_row()]));
        let recorder = recorder_with(ledger.clone());

        recorder.submit_bet("bet A Foo/Bar @2 1k", october()).await.unwrap();

        assert!(ledger.formatting_log().await.is_empty());
        assert_eq!(ledger.sheet_metadata().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_match_grouped() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = recorder_with(ledger.clone());

        recorder.submit_bet("bet A Foo/Bar @2 1k", october()).await.unwrap();
        recorder.submit_bet("bet B Baz/Qux @2 1k", october()).await.unwrap();
        let third = recorder.submit_bet("bet C Foo/Bar @3 2k", october()).await.unwrap();
        assert_eq!(third.placement, Placement { row: 3, insert: true });

        let rows = ledger.rows("October").await.unwrap();
        assert_eq!(
            match_column(&rows),
            vec!["Match", "A Foo/Bar @2 1k", "C Foo/Bar @3 2k", "B Baz/Qux @2 1k"]
        );
        // Formulas follow the row they were written to.
        assert!(rows[2][8].contains("H3"));
    }

    #[tokio::test]
    async fn test_total_overwrites_matched_row() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = recorder_with(ledger.clone());

        recorder.submit_bet("bet A Foo/Bar @2 1k", october()).await.unwrap();
        recorder.submit_bet("bet B Baz/Qux @2 1k", october()).await.unwrap();
        let total = recorder
            .submit_bet("bet Foo/Bar total @1.9 3k", october())
            .await
            .unwrap();
        assert_eq!(total.placement, Placement { row: 2, insert: false });

        let rows = ledger.rows("October").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "Foo/Bar total @1.9 3k");
        assert_eq!(rows[1][3], "N/A");
        assert_eq!(rows[1][2], "3,000");
    }

    #[tokio::test]
    async fn test_week_marker_scopes_grouping() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = recorder_with(ledger.clone());

        recorder.submit_bet("bet A Foo/Bar @2 1k", october()).await.unwrap();
        recorder.submit_bet("bet B Baz/Qux @2 1k", october()).await.unwrap();
        let marker = recorder.mark_end_of_week(october()).await.unwrap();
        assert_eq!(marker, WeekMarker { marker_row: 4, header_row: 5 });

        let next = recorder.submit_bet("bet C Foo/Bar @3 2k", october()).await.unwrap();
        assert_eq!(next.placement, Placement { row: 6, insert: false });

        let rows = ledger.rows("October").await.unwrap();
        assert_eq!(rows[3], vec!["End of Week".to_string()]);
        assert_eq!(rows[4], header_row());
    }

    #[tokio::test]
    async fn test_week_marker_formatting() {
        let ledger = Arc::new(MemoryLedger::new().with_sheet("October", vec![header_row()]));
        let recorder = recorder_with(ledger.clone());

        recorder.mark_end_of_week(october()).await.unwrap();

        let log: Vec<FormatRequest> = ledger
            .formatting_log()
            .await
            .into_iter()
            .map(|(_, r)| r)
            .collect();
        assert_eq!(
            log,
            vec![
                FormatRequest::MarkerStyle { row: 2 },
                FormatRequest::HeaderStyle { row: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_markers_are_not_deduplicated() {
        let ledger = Arc::new(MemoryLedger::new().with_sheet("October", vec![header_row()]));
        let recorder = recorder_with(ledger.clone());

        let first = recorder.mark_end_of_week(october()).await.unwrap();
        let second = recorder.mark_end_of_week(october()).await.unwrap();
        assert_eq!(first.marker_row, 2);
        assert_eq!(second.marker_row, 4);
    }

    #[tokio::test]
    async fn test_parse_error_touches_nothing() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = recorder_with(ledger.clone());

        let err = recorder.submit_bet("bet Bet365 TeamA/TeamB 5k", october()).await.unwrap_err();
        assert!(matches!(err, BookError::Parse(_)));
        assert!(ledger.sheet_metadata().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_bets_are_serialised() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = Arc::new(recorder_with(ledger.clone()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let recorder = recorder.clone();
                tokio::spawn(async move {
                    let text = format!("bet P{i} Foo/Bar @2 {}k", i + 1);
                    recorder.submit_bet(&text, october()).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let rows = ledger.rows("October").await.unwrap();
        // Header plus eight bets, no bet lost to a racing overwrite.
        assert_eq!(rows.len(), 9);
        assert!(rows[1..].iter().all(|r| r[1].contains("Foo/Bar")));
    }

    #[tokio::test]
    async fn test_ledger_error_propagates() {
        let mut mock = MockLedgerService::new();
        mock.expect_sheet_metadata().returning(|| {
            Ok(vec![SheetInfo {
                title: "October".to_string(),
                id: 1,
            }])
        });
        mock.expect_read_range().returning(|_, _| {
            Err(LedgerError::Api {
                status: 429,
                body: "Quota exceeded".to_string(),
            })
        });
        mock.expect_write_range().never();
        mock.expect_name().return_const("mock".to_string());

        let recorder = BetRecorder::new(Arc::new(mock), BookConfig::default());
        let err = recorder
            .submit_bet("bet Bet365 TeamA/TeamB @1.85 5k", october())
            .await
            .unwrap_err();

        assert!(matches!(err, BookError::Ledger(LedgerError::Api { status: 429, .. })));
        assert_eq!(recorder.ledger_name(), "mock");
    }
}
