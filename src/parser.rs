//! Free-text bet parser.
//!
//! Bets are typed by hand into a chat, so the input is a loose bag of
//! tokens rather than a grammar. Each field has its own extraction
//! function over the message remainder; `parse_bet` composes them and
//! decides which fields are mandatory. Unknown tokens are ignored and the
//! required tokens may appear in any order, with one exception: the
//! amount phrase is recognised only directly after an odds value.
//!
//! ```text
//! /bet Bet365 TeamA/TeamB 1h o2.5 @1.85 5k USD
//!      |      |           |  |    |     |  `- currency (default USD)
//!      |      |           |  |    |     `- stake, k = x1000
//!      |      |           |  |    `- odds (a second @ value = correct odds)
//!      |      |           |  `- points line
//!      |      |           `- period
//!      |      `- match label
//!      `- platform (forced to N/A when the word "total" appears)
//! ```

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

use crate::error::ParseError;
use crate::types::{BetRecord, Period, NO_PLATFORM};

/// Currency assumed when the amount phrase carries no 3-letter code.
pub const DEFAULT_CURRENCY: &str = "USD";

lazy_static! {
    static ref MATCH_RE: Regex = Regex::new(r"[A-Za-z]+/[A-Za-z]+").unwrap();
    static ref PERIOD_RE: Regex = Regex::new(r"(?i)\b(1h|2h|ot|ht)\b").unwrap();
    static ref POINTS_RE: Regex =
        Regex::new(r"(?i)\b[uo]\d+(?:\.\d+)?\b|[+-]\d+(?:\.\d+)?").unwrap();
    static ref ODDS_RE: Regex = Regex::new(r"@(\d+(?:\.\d+)?)").unwrap();
    // Letters touching the digits are a suffix ("5k", "5kusd", "5usd");
    // letters after a space are the currency ("5 kes" is 5 KES).
    static ref STAKE_RE: Regex = Regex::new(
        r"@\d+(?:\.\d+)?\s+(?P<amount>\d+(?:\.\d+)?)(?P<suffix>[A-Za-z]*)(?:\s+(?P<letters>[A-Za-z]+))?"
    )
    .unwrap();
    static ref TOTAL_RE: Regex = Regex::new(r"(?i)\btotal\b").unwrap();
}

/// Stake and currency recovered from the amount phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakePhrase {
    pub amount: Decimal,
    pub currency: String,
}

// ---------------------------------------------------------------------------
// Field extractors
// ---------------------------------------------------------------------------

/// First whitespace-separated token, taken as the bookmaker name.
pub fn extract_platform(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// First `letters/letters` label, e.g. `TeamA/TeamB`.
pub fn extract_match_label(text: &str) -> Option<&str> {
    MATCH_RE.find(text).map(|m| m.as_str())
}

pub fn extract_period(text: &str) -> Option<Period> {
    PERIOD_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Over/under (`o2.5`, `U3`) or handicap (`+1.5`, `-1`) line, upper-cased.
pub fn extract_points_line(text: &str) -> Option<String> {
    POINTS_RE.find(text).map(|m| m.as_str().to_uppercase())
}

/// Every `@<number>` value, in order of appearance.
pub fn extract_odds(text: &str) -> Result<Vec<Decimal>, ParseError> {
    ODDS_RE
        .captures_iter(text)
        .map(|caps| parse_decimal(&caps[1]))
        .collect()
}

/// Amount phrase following an odds value: `<number>[k][CUR]` or
/// `<number>[k] CUR`.
///
/// Any other letters glued to the number (`1h`) make the phrase invalid.
pub fn extract_stake(text: &str) -> Result<Option<StakePhrase>, ParseError> {
    let Some(caps) = STAKE_RE.captures(text) else {
        return Ok(None);
    };

    let suffix = &caps["suffix"];
    let (thousands, glued_currency) = match suffix.len() {
        0 => (false, None),
        1 if suffix.eq_ignore_ascii_case("k") => (true, None),
        3 => (false, Some(suffix)),
        4 if suffix[..1].eq_ignore_ascii_case("k") => (true, Some(&suffix[1..])),
        _ => return Err(ParseError::MissingAmount),
    };

    let mut amount = parse_decimal(&caps["amount"])?;
    if thousands {
        amount = amount
            .checked_mul(dec!(1000))
            .ok_or_else(|| ParseError::InvalidNumber(format!("{}{suffix}", &caps["amount"])))?;
    }

    let currency = glued_currency
        .or_else(|| {
            caps.name("letters")
                .map(|m| m.as_str())
                .filter(|letters| letters.len() == 3)
        })
        .map(|letters| letters.to_uppercase())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    Ok(Some(StakePhrase { amount, currency }))
}

/// Whether the word `total` appears anywhere.
pub fn is_total_bet(text: &str) -> bool {
    TOTAL_RE.is_match(text)
}

fn parse_decimal(raw: &str) -> Result<Decimal, ParseError> {
    Decimal::from_str(raw).map_err(|_| ParseError::InvalidNumber(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Record builder
// ---------------------------------------------------------------------------

/// Parse a full command message (`<command> <details...>`) into a bet
/// dated `date`.
///
/// The leading token is the command label and is discarded.
pub fn parse_bet(text: &str, date: NaiveDate) -> Result<BetRecord, ParseError> {
    let remainder = text
        .trim()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
        .ok_or(ParseError::MissingPayload)?;

    let match_label = extract_match_label(remainder).ok_or(ParseError::MissingMatch)?;

    let odds = extract_odds(remainder)?;
    let nominal_odds = *odds.first().ok_or(ParseError::MissingOdds)?;
    let correct_odds = odds.get(1).copied();

    let stake = extract_stake(remainder)?.ok_or(ParseError::MissingAmount)?;

    let is_total = is_total_bet(remainder);
    let platform = if is_total {
        NO_PLATFORM.to_string()
    } else {
        extract_platform(remainder).unwrap_or(NO_PLATFORM).to_string()
    };

    Ok(BetRecord {
        date,
        description: remainder.to_string(),
        match_label: match_label.to_string(),
        stake: stake.amount,
        currency: stake.currency,
        platform,
        odds: nominal_odds,
        correct_odds,
        period: extract_period(remainder),
        points_line: extract_points_line(remainder).unwrap_or_default(),
        is_total,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
