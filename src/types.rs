//! Shared types for BETBOOK.
//!
//! These types form the data model used across all modules: the parsed
//! bet record, the fixed ledger column layout, and the small value types
//! exchanged with the ledger service.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Ledger layout
// ---------------------------------------------------------------------------

/// One spreadsheet row as read from or written to the ledger.
pub type LedgerRow = Vec<String>;

/// Header row written at the top of every month sheet and after each
/// week marker.
pub const HEADERS: [&str; 11] = [
    "Date",
    "Match",
    "Amount",
    "Platform",
    "Odds",
    "Correct Odds",
    "Profit",
    "Win/Lose",
    "Outcome $",
    "Peso",
    "TXT 2% COMS",
];

/// Number of columns in the fixed ledger layout (A..=K).
pub const COLUMN_COUNT: usize = HEADERS.len();

/// Columns of the ledger, in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Date,
    Match,
    Amount,
    Platform,
    Odds,
    CorrectOdds,
    Profit,
    WinLose,
    OutcomeAmount,
    Peso,
    Commission,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Date,
        Column::Match,
        Column::Amount,
        Column::Platform,
        Column::Odds,
        Column::CorrectOdds,
        Column::Profit,
        Column::WinLose,
        Column::OutcomeAmount,
        Column::Peso,
        Column::Commission,
    ];

    /// Zero-based column index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// A1-notation column letter.
    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }

    pub fn header(self) -> &'static str {
        HEADERS[self.index()]
    }

    /// A1 reference to this column on a given 1-based row, e.g. `C10`.
    pub fn cell(self, row: usize) -> String {
        format!("{}{row}", self.letter())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// The header row as owned cell values.
pub fn header_row() -> LedgerRow {
    Column::ALL.iter().map(|c| c.header().to_string()).collect()
}

// ---------------------------------------------------------------------------
// Bet record
// ---------------------------------------------------------------------------

/// Platform placeholder used for total bets, which are not tied to one
/// bookmaker.
pub const NO_PLATFORM: &str = "N/A";

/// Rendered in the Correct Odds column when no second odds value was given.
pub const NO_CORRECT_ODDS: &str = "0";

/// Game period a bet refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    FirstHalf,
    SecondHalf,
    Overtime,
    HalfTime,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::FirstHalf => "1H",
            Period::SecondHalf => "2H",
            Period::Overtime => "OT",
            Period::HalfTime => "HT",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Case-insensitive parse of `1H`, `2H`, `OT`, `HT`.
impl std::str::FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1H" => Ok(Period::FirstHalf),
            "2H" => Ok(Period::SecondHalf),
            "OT" => Ok(Period::Overtime),
            "HT" => Ok(Period::HalfTime),
            other => Err(anyhow::anyhow!("Unknown period: {other}")),
        }
    }
}

/// A bet parsed from a chat message. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub date: NaiveDate,
    /// Free text after the command token; written to the Match column.
    pub description: String,
    /// `TeamA/TeamB` label used to group rows for the same match.
    pub match_label: String,
    pub stake: Decimal,
    /// Three-letter upper-case currency code.
    pub currency: String,
    /// Bookmaker name as typed, or `N/A` for totals.
    pub platform: String,
    pub odds: Decimal,
    pub correct_odds: Option<Decimal>,
    pub period: Option<Period>,
    /// Upper-cased points line such as `O2.5` or `+1`, empty when absent.
    pub points_line: String,
    pub is_total: bool,
}

impl BetRecord {
    /// Stake with thousands separators, e.g. `5,000`.
    pub fn stake_display(&self) -> String {
        format_thousands(self.stake)
    }

    pub fn correct_odds_display(&self) -> String {
        self.correct_odds
            .map(|o| o.to_string())
            .unwrap_or_else(|| NO_CORRECT_ODDS.to_string())
    }

    pub fn period_display(&self) -> &'static str {
        self.period.map(|p| p.as_str()).unwrap_or("")
    }

    /// Cells A..=F of the ledger row for this bet. The derived columns
    /// are filled with formulas separately.
    pub fn ledger_cells(&self) -> LedgerRow {
        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.description.clone(),
            self.stake_display(),
            self.platform.to_uppercase(),
            self.odds.to_string(),
            self.correct_odds_display(),
        ]
    }

    /// Helper to build a sample record for tests.
    #[cfg(test)]
    pub fn sample() -> Self {
        use rust_decimal_macros::dec;
        BetRecord {
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            description: "Bet365 TeamA/TeamB @1.85 5k USD".to_string(),
            match_label: "TeamA/TeamB".to_string(),
            stake: dec!(5000),
            currency: "USD".to_string(),
            platform: "Bet365".to_string(),
            odds: dec!(1.85),
            correct_odds: None,
            period: None,
            points_line: String::new(),
            is_total: false,
        }
    }
}

impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @{} {} {}{}",
            self.platform,
            self.match_label,
            self.odds,
            self.stake_display(),
            self.currency,
            if self.is_total { " (total)" } else { "" },
        )
    }
}

/// Format a decimal with `,` thousands separators, dropping trailing
/// fractional zeros: `5000` becomes `5,000`, `2500.50` becomes `2,500.5`.
pub fn format_thousands(value: Decimal) -> String {
    let normalized = value.normalize();
    let text = normalized.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if normalized.is_sign_negative() && !normalized.is_zero() { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

// ---------------------------------------------------------------------------
// Ledger service value types
// ---------------------------------------------------------------------------

/// Worksheet metadata as reported by the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub title: String,
    pub id: i64,
}

/// A resolved worksheet: title for value ranges, id for structural edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetHandle {
    pub title: String,
    pub id: i64,
}

impl From<SheetInfo> for SheetHandle {
    fn from(info: SheetInfo) -> Self {
        SheetHandle {
            title: info.title,
            id: info.id,
        }
    }
}

/// How written values are interpreted by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Stored verbatim.
    Raw,
    /// Parsed like typed input, so `=` prefixed strings become formulas.
    UserEntered,
}

impl InputMode {
    /// Google Sheets `valueInputOption` value.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            InputMode::Raw => "RAW",
            InputMode::UserEntered => "USER_ENTERED",
        }
    }
}

/// Settled result of a bet, as chosen in the Win/Lose dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Win, Outcome::Lose, Outcome::Draw];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Lose => "LOSE",
            Outcome::Draw => "DRAW",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_column_letters() {
        assert_eq!(Column::Date.letter(), 'A');
        assert_eq!(Column::Amount.letter(), 'C');
        assert_eq!(Column::WinLose.letter(), 'H');
        assert_eq!(Column::Commission.letter(), 'K');
        assert_eq!(Column::CorrectOdds.cell(10), "F10");
    }

    #[test]
    fn test_column_headers_match_layout() {
        assert_eq!(Column::ALL.len(), COLUMN_COUNT);
        assert_eq!(Column::OutcomeAmount.header(), "Outcome $");
        assert_eq!(Column::Commission.header(), "TXT 2% COMS");
        assert_eq!(header_row().len(), 11);
        assert_eq!(header_row()[Column::WinLose.index()], "Win/Lose");
        assert_eq!(header_row()[Column::Commission.index()], Column::Commission.header());
    }

    #[test]
    fn test_period_from_str_case_insensitive() {
        assert_eq!("1h".parse::<Period>().unwrap(), Period::FirstHalf);
        assert_eq!("Ot".parse::<Period>().unwrap(), Period::Overtime);
        assert_eq!("HT".parse::<Period>().unwrap(), Period::HalfTime);
        assert!("3H".parse::<Period>().is_err());
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(dec!(750)), "750");
        assert_eq!(format_thousands(dec!(2000)), "2,000");
        assert_eq!(format_thousands(dec!(1234567)), "1,234,567");
        assert_eq!(format_thousands(dec!(2500.50)), "2,500.5");
        assert_eq!(format_thousands(dec!(-12000)), "-12,000");
        assert_eq!(format_thousands(dec!(0)), "0");
    }

    #[test]
    fn test_ledger_cells() {
        let mut bet = BetRecord::sample();
        bet.correct_odds = Some(dec!(1.95));
        let cells = bet.ledger_cells();
        assert_eq!(
            cells,
            vec![
                "2026-10-16",
                "Bet365 TeamA/TeamB @1.85 5k USD",
                "5,000",
                "BET365",
                "1.85",
                "1.95",
            ]
        );
    }

    #[test]
    fn test_correct_odds_sentinel() {
        let bet = BetRecord::sample();
        assert_eq!(bet.correct_odds_display(), "0");
        assert_eq!(bet.period_display(), "");
    }

    #[test]
    fn test_input_mode_api_str() {
        assert_eq!(InputMode::Raw.as_api_str(), "RAW");
        assert_eq!(InputMode::UserEntered.as_api_str(), "USER_ENTERED");
    }
}
