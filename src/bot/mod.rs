//! Chat command surface.
//!
//! Maps `/start`, `/help`, `/bet` and `/end` messages onto the recorder and
//! renders the text reply for each. Transport lives in [`telegram`].

pub mod telegram;

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::dashboard::AppState;
use crate::engine::recorder::{BetRecorder, RecordedBet};
use crate::error::BookError;

pub const WELCOME_MESSAGE: &str = "Welcome to the Betting Bot!\n\
    You can log your bets using the /bet command.\n\
    For example:\n\
    /bet <website> <match> <points> <odds> <amount> <currency>";

pub const END_OF_WEEK_OK: &str = "End of Week marker and headers added successfully.";
pub const END_OF_WEEK_FAILED: &str =
    "An error occurred while adding the End of Week marker and headers.";

/// A recognised chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    /// Full message text; the parser drops the command token itself.
    Bet(String),
    End,
}

impl Command {
    /// Recognise a command message. `/bet@SomeBot` is treated like `/bet`.
    /// Plain text and unknown commands yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(n, _)| n);

        match name.to_ascii_lowercase().as_str() {
            "start" | "help" => Some(Command::Start),
            "bet" => Some(Command::Bet(text.to_string())),
            "end" => Some(Command::End),
            _ => None,
        }
    }
}

/// Confirmation sent after a bet is saved.
pub fn bet_summary(recorded: &RecordedBet) -> String {
    let bet = &recorded.bet;
    let match_line = [
        bet.match_label.to_uppercase(),
        bet.period_display().to_string(),
        bet.points_line.clone(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ");
    let correct_odds = bet
        .correct_odds
        .map(|o| o.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "Bet saved successfully!\n\n\
         ----Bet Summary----\n\
         Website: {}\n\
         Match: {}\n\
         Odds: {}\n\
         Correct Odds: {}\n\
         Amount: {} {}",
        bet.platform.to_uppercase(),
        match_line,
        bet.odds,
        correct_odds,
        bet.stake_display(),
        bet.currency,
    )
}

/// Turns command messages into recorder calls and replies.
pub struct Dispatcher {
    recorder: Arc<BetRecorder>,
    state: AppState,
}

impl Dispatcher {
    pub fn new(recorder: Arc<BetRecorder>, state: AppState) -> Self {
        Self { recorder, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Handle one message sent on `date`. Returns the reply, or `None` for
    /// messages that are not commands.
    pub async fn handle(&self, text: &str, date: NaiveDate) -> Option<String> {
        let reply = match Command::parse(text)? {
            Command::Start => WELCOME_MESSAGE.to_string(),
            Command::Bet(text) => self.handle_bet(&text, date).await,
            Command::End => self.handle_end(date).await,
        };
        Some(reply)
    }

    async fn handle_bet(&self, text: &str, date: NaiveDate) -> String {
        match self.recorder.submit_bet(text, date).await {
            Ok(recorded) => {
                let mut stats = self.state.stats.write().await;
                stats.bets_recorded += 1;
                stats.last_bet_row = Some(recorded.placement.row);
                stats.last_sheet = Some(recorded.sheet.clone());
                bet_summary(&recorded)
            }
            Err(BookError::Parse(e)) => {
                warn!(error = %e, input = text, "Bet rejected");
                self.state.stats.write().await.parse_failures += 1;
                BookError::Parse(e).user_message()
            }
            Err(e) => {
                error!(error = %e, input = text, ledger = self.recorder.ledger_name(), "Failed to save bet");
                self.state.stats.write().await.ledger_failures += 1;
                e.user_message()
            }
        }
    }

    async fn handle_end(&self, date: NaiveDate) -> String {
        match self.recorder.mark_end_of_week(date).await {
            Ok(marker) => {
                info!(row = marker.marker_row, "Week closed");
                self.state.stats.write().await.week_markers += 1;
                END_OF_WEEK_OK.to_string()
            }
            Err(e) => {
                error!(error = %e, ledger = self.recorder.ledger_name(), "Failed to add week marker");
                self.state.stats.write().await.ledger_failures += 1;
                END_OF_WEEK_FAILED.to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
