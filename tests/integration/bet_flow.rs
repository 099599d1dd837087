//! End-to-end command flows: chat text in, sheet rows and replies out.

use chrono::NaiveDate;
use std::sync::Arc;

use betbook::bot::{Dispatcher, END_OF_WEEK_FAILED, END_OF_WEEK_OK};
use betbook::config::BookConfig;
use betbook::dashboard::DashboardState;
use betbook::engine::recorder::BetRecorder;
use betbook::error::RETRY_LATER_MESSAGE;
use betbook::ledger::memory::MemoryLedger;
use betbook::types::{header_row, LedgerRow};

use crate::flaky_ledger::FlakyLedger;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

fn setup() -> (Arc<MemoryLedger>, Dispatcher) {
    let ledger = Arc::new(MemoryLedger::new());
    let recorder = BetRecorder::new(ledger.clone(), BookConfig::default());
    let dispatcher = Dispatcher::new(
        Arc::new(recorder),
        Arc::new(DashboardState::new("BETBOOK", "memory")),
    );
    (ledger, dispatcher)
}

fn descriptions(rows: &[LedgerRow]) -> Vec<&str> {
    rows.iter()
        .map(|r| r.get(1).map(String::as_str).unwrap_or(""))
        .collect()
}

#[tokio::test]
async fn test_two_weeks_of_bets() {
    let (ledger, bot) = setup();

    // Week one
    for text in [
        "/bet Bet365 Lakers/Celtics 1h o210.5 @1.9 2k",
        "/bet Pinnacle Arsenal/Chelsea @2.05 1k usd",
        "/bet TextOdds Lakers/Celtics 2h u105 @1.85 @1.95 3k",
    ] {
        let reply = bot.handle(text, day(5)).await.unwrap();
        assert!(reply.starts_with("Bet saved successfully!"), "{reply}");
    }
    assert_eq!(bot.handle("/end", day(9)).await.unwrap(), END_OF_WEEK_OK);

    // Week two: the same match starts a fresh group.
    bot.handle("/bet Bet365 Lakers/Celtics @1.7 1k", day(12)).await.unwrap();
    bot.handle("/bet Betway Real/Barca @2.4 500", day(12)).await.unwrap();
    bot.handle("/bet Lakers/Celtics total @1.8 4k", day(13)).await.unwrap();

    let rows = ledger.rows("October").await.unwrap();
    assert_eq!(
        descriptions(&rows),
        vec![
            "Match",
            "Bet365 Lakers/Celtics 1h o210.5 @1.9 2k",
            "TextOdds Lakers/Celtics 2h u105 @1.85 @1.95 3k",
            "Pinnacle Arsenal/Chelsea @2.05 1k usd",
            "",
            "Match",
            "Lakers/Celtics total @1.8 4k",
            "Betway Real/Barca @2.4 500",
        ]
    );
    assert_eq!(rows[4], vec!["End of Week".to_string()]);
    assert_eq!(rows[5], header_row());

    // The total replaced the week-two Lakers/Celtics row in place.
    assert_eq!(rows[6][2], "4,000");
    assert_eq!(rows[6][3], "N/A");
    assert!(rows[6][8].contains("H7"));

    // Commission platform row carries the commission formula for its row.
    assert_eq!(rows[2][3], "TEXTODDS");
    assert_eq!(rows[2][5], "1.95");
    assert!(rows[2][10].contains("C3 * 60 * 0.02"));

    let stats = bot.state().snapshot().await;
    assert_eq!(stats.bets_recorded, 6);
    assert_eq!(stats.week_markers, 1);
    assert_eq!(stats.last_bet_row, Some(7));
}

#[tokio::test]
async fn test_months_use_separate_sheets() {
    let (ledger, bot) = setup();

    bot.handle("/bet Bet365 Foo/Bar @2 1k", day(31)).await.unwrap();
    let november = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
    bot.handle("/bet Bet365 Foo/Bar @2 1k", november).await.unwrap();

    assert_eq!(ledger.rows("October").await.unwrap().len(), 2);
    assert_eq!(ledger.rows("November").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rejected_bets_leave_sheet_untouched() {
    let (ledger, bot) = setup();
    bot.handle("/bet Bet365 Foo/Bar @2 1k", day(5)).await.unwrap();

    for text in ["/bet", "/bet Bet365 @2 1k", "/bet Bet365 Foo/Bar 1k", "/bet Bet365 Foo/Bar @2"] {
        let reply = bot.handle(text, day(5)).await.unwrap();
        assert!(reply.starts_with("Error: "), "{text} -> {reply}");
    }

    assert_eq!(ledger.rows("October").await.unwrap().len(), 2);
    assert_eq!(bot.state().snapshot().await.parse_failures, 4);
}

#[tokio::test]
async fn test_ledger_outage_and_recovery() {
    let memory = Arc::new(MemoryLedger::new());
    let flaky = Arc::new(FlakyLedger::new(memory.clone()));
    let recorder = BetRecorder::new(flaky.clone(), BookConfig::default());
    let bot = Dispatcher::new(
        Arc::new(recorder),
        Arc::new(DashboardState::new("BETBOOK", "flaky")),
    );

    flaky.set_error("Quota exceeded");
    let reply = bot.handle("/bet Bet365 Foo/Bar @2 1k", day(5)).await.unwrap();
    assert_eq!(reply, RETRY_LATER_MESSAGE);
    assert_eq!(bot.handle("/end", day(5)).await.unwrap(), END_OF_WEEK_FAILED);
    assert_eq!(flaky.writes(), 0);

    flaky.clear_error();
    let reply = bot.handle("/bet Bet365 Foo/Bar @2 1k", day(5)).await.unwrap();
    assert!(reply.starts_with("Bet saved successfully!"));

    let rows = memory.rows("October").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(bot.state().snapshot().await.ledger_failures, 2);
}
