//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (bot token, spreadsheet id, key file path) are referenced by
//! env-var name in the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub book: BookConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub name: String,
    pub telegram_token_env: String,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Pause after a failed poll before trying again.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    pub spreadsheet_id_env: String,
    pub service_account_file_env: String,
    /// Keep the ledger in memory instead of writing to Google Sheets.
    #[serde(default)]
    pub dry_run: bool,
}

/// Bookkeeping constants baked into the sheet formulas and markers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BookConfig {
    /// Conversion rate from the stake currency to pesos.
    pub peso_rate: Decimal,
    /// Commission charged on stakes placed through `commission_platform`.
    pub commission_rate: Decimal,
    /// Platform that pays commission and earns no profit-from-odds.
    pub commission_platform: String,
    /// Text written in column A of week-marker rows.
    pub week_marker_label: String,
    /// Last row covered by the Win/Lose dropdown and highlights.
    pub validation_rows: usize,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            peso_rate: dec!(60),
            commission_rate: dec!(0.02),
            commission_platform: "TEXTODDS".to_string(),
            week_marker_label: "End of Week".to_string(),
            validation_rows: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_dashboard_port(),
        }
    }
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_error_backoff() -> u64 {
    5
}

fn default_dashboard_port() -> u16 {
    8080
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [bot]
        name = "BETBOOK-TEST"
        telegram_token_env = "TELEGRAM_TOKEN"

        [ledger]
        spreadsheet_id_env = "GOOGLE_SHEET_ID"
        service_account_file_env = "GOOGLE_SERVICE_ACCOUNT_FILE"
        dry_run = true

        [book]
        peso_rate = 58
        commission_rate = 0.03

        [dashboard]
        enabled = true
    "#;

    #[test]
    fn test_from_toml() {
        let cfg = AppConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.bot.name, "BETBOOK-TEST");
        assert_eq!(cfg.bot.poll_timeout_secs, 30);
        assert_eq!(cfg.bot.error_backoff_secs, 5);
        assert!(cfg.ledger.dry_run);
        assert_eq!(cfg.book.peso_rate, dec!(58));
        assert_eq!(cfg.book.commission_rate, dec!(0.03));
        // Unset book fields fall back to defaults
        assert_eq!(cfg.book.commission_platform, "TEXTODDS");
        assert_eq!(cfg.book.week_marker_label, "End of Week");
        assert!(cfg.dashboard.enabled);
        assert_eq!(cfg.dashboard.port, 8080);
    }

    #[test]
    fn test_book_section_optional() {
        let minimal = r#"
            [bot]
            name = "x"
            telegram_token_env = "T"
            [ledger]
            spreadsheet_id_env = "S"
            service_account_file_env = "F"
        "#;
        let cfg = AppConfig::from_toml(minimal).unwrap();
        assert_eq!(cfg.book, BookConfig::default());
        assert!(!cfg.ledger.dry_run);
        assert!(!cfg.dashboard.enabled);
    }

    #[test]
    fn test_load_config() {
        // Requires config.toml in the working directory; absent in some
        // test environments.
        if let Ok(cfg) = AppConfig::load("config.toml") {
            assert_eq!(cfg.bot.telegram_token_env, "TELEGRAM_TOKEN");
            assert!(cfg.book.peso_rate > Decimal::ZERO);
        }
    }

    #[test]
    fn test_resolve_env_missing() {
        let err = AppConfig::resolve_env("BETBOOK_DEFINITELY_UNSET_VAR").unwrap_err();
        assert!(err.to_string().contains("BETBOOK_DEFINITELY_UNSET_VAR"));
    }
}
