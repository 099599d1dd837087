//! Error taxonomy.
//!
//! `ParseError` is a correctable input mistake and is shown to the user
//! verbatim. `LedgerError` covers every failure of the spreadsheet
//! collaborator and is only ever shown as a generic retry message.

use thiserror::Error;

/// Malformed free-text bet description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid bet format. Usage: /bet <website> <match> <odds> <amount> <currency>")]
    MissingPayload,
    #[error("Invalid bet details: no match found (expected TeamA/TeamB).")]
    MissingMatch,
    #[error("Invalid bet details: no odds found (expected @<odds>).")]
    MissingOdds,
    #[error("Invalid bet details: no amount found after the odds (expected e.g. 5k USD).")]
    MissingAmount,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

/// Failure reported by (or while talking to) the ledger service.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("ledger request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ledger API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed ledger response: {0}")]
    Malformed(String),
    #[error("invalid range: {0}")]
    InvalidRange(String),
}

/// Any failure of a bookkeeping command.
#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Reply text shown for any ledger failure.
pub const RETRY_LATER_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

impl BookError {
    /// Text safe to send back to the chat. Ledger details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            BookError::Parse(e) => format!("Error: {e}"),
            BookError::Ledger(_) => RETRY_LATER_MESSAGE.to_string(),
        }
    }
}
