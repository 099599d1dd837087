//! BETBOOK: Telegram bet logger writing to a Google Sheets ledger.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects the ledger, and long-polls Telegram for commands until
//! Ctrl+C.

use anyhow::{Context, Result};
use secrecy::Secret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use betbook::bot::telegram::{next_offset, TelegramClient, Update};
use betbook::bot::Dispatcher;
use betbook::config;
use betbook::dashboard::{self, DashboardState};
use betbook::engine::recorder::BetRecorder;
use betbook::ledger::auth::ServiceAccountAuth;
use betbook::ledger::memory::MemoryLedger;
use betbook::ledger::sheets::SheetsClient;
use betbook::ledger::LedgerService;

const BANNER: &str = r#"
 ____  _____ _____ ____   ___   ___  _  __
| __ )| ____|_   _| __ ) / _ \ / _ \| |/ /
|  _ \|  _|   | | |  _ \| | | | | | | ' /
| |_) | |___  | | | |_) | |_| | |_| | . \
|____/|_____| |_| |____/ \___/ \___/|_|\_\

  Bet bookkeeping bot
  v0.1.0
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("BETBOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        bot_name = %cfg.bot.name,
        config = %config_path,
        dry_run = cfg.ledger.dry_run,
        peso_rate = %cfg.book.peso_rate,
        commission_platform = %cfg.book.commission_platform,
        "BETBOOK starting up"
    );

    // -- Initialise components -------------------------------------------

    let ledger = build_ledger(&cfg.ledger)?;
    info!(ledger = ledger.name(), "Ledger ready");

    let state = Arc::new(DashboardState::new(&cfg.bot.name, ledger.name()));
    let recorder = Arc::new(BetRecorder::new(ledger, cfg.book.clone()));
    let dispatcher = Dispatcher::new(recorder, state.clone());

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(state, cfg.dashboard.port).await?;
    }

    let token = config::AppConfig::resolve_env(&cfg.bot.telegram_token_env)?;
    let telegram = TelegramClient::new(Secret::new(token), cfg.bot.poll_timeout_secs)?;

    // -- Main loop -------------------------------------------------------

    let backoff = Duration::from_secs(cfg.bot.error_backoff_secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut offset = 0;

    info!(
        poll_timeout_secs = cfg.bot.poll_timeout_secs,
        "Polling for commands. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            polled = telegram.get_updates(offset, cfg.bot.poll_timeout_secs) => {
                match polled {
                    Ok(updates) => {
                        offset = next_offset(offset, &updates);
                        for update in updates {
                            let span = info_span!(
                                "update",
                                id = %Uuid::new_v4(),
                                update_id = update.update_id
                            );
                            handle_update(&telegram, &dispatcher, update).instrument(span).await;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, backoff_secs = backoff.as_secs(), "Polling failed");
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    let stats = dispatcher.state().snapshot().await;
    info!(
        bets = stats.bets_recorded,
        week_markers = stats.week_markers,
        parse_failures = stats.parse_failures,
        ledger_failures = stats.ledger_failures,
        "BETBOOK shut down cleanly."
    );

    Ok(())
}

/// Dispatch one update and send the reply, if any.
async fn handle_update(telegram: &TelegramClient, dispatcher: &Dispatcher, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    let Some(text) = message.text.as_deref() else {
        return;
    };

    let Some(reply) = dispatcher.handle(text, message.local_date()).await else {
        return;
    };
    if let Err(e) = telegram.send_message(message.chat.id, &reply).await {
        warn!(error = %e, chat_id = message.chat.id, "Failed to send reply");
    }
}

/// Pick the ledger backend. Dry runs keep everything in memory.
fn build_ledger(cfg: &config::LedgerConfig) -> Result<Arc<dyn LedgerService>> {
    if cfg.dry_run {
        warn!("Dry-run mode: bets are kept in memory and lost on exit");
        return Ok(Arc::new(MemoryLedger::new()));
    }

    let spreadsheet_id = config::AppConfig::resolve_env(&cfg.spreadsheet_id_env)?;
    let key_path = config::AppConfig::resolve_env(&cfg.service_account_file_env)?;
    let auth = ServiceAccountAuth::from_file(&key_path)
        .with_context(|| format!("Failed to load service account key from {key_path}"))?;
    let client = SheetsClient::new(spreadsheet_id, auth)?;

    Ok(Arc::new(client))
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("betbook=info"));

    let json_logging = std::env::var("BETBOOK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
