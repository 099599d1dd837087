//! Status API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Counters updated by the command dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BotStats {
    pub bets_recorded: u64,
    pub week_markers: u64,
    pub parse_failures: u64,
    pub ledger_failures: u64,
    /// Row of the most recently recorded bet.
    pub last_bet_row: Option<usize>,
    pub last_sheet: Option<String>,
}

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub bot_name: String,
    pub ledger_name: String,
    pub started_at: DateTime<Utc>,
    pub stats: RwLock<BotStats>,
}

impl DashboardState {
    pub fn new(bot_name: &str, ledger_name: &str) -> Self {
        Self {
            bot_name: bot_name.to_string(),
            ledger_name: ledger_name.to_string(),
            started_at: Utc::now(),
            stats: RwLock::new(BotStats::default()),
        }
    }

    pub async fn snapshot(&self) -> BotStats {
        self.stats.read().await.clone()
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub bot: String,
    pub ledger: String,
    pub uptime_secs: i64,
    #[serde(flatten)]
    pub stats: BotStats,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let stats = state.snapshot().await;
    Json(StatusResponse {
        bot: state.bot_name.clone(),
        ledger: state.ledger_name.clone(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        stats,
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
