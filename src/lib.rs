//! BETBOOK: Telegram bet logger writing to a Google Sheets ledger.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod error;
pub mod parser;
pub mod ledger;
pub mod engine;
pub mod bot;
pub mod dashboard;
