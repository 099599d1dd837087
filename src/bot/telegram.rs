//! Telegram Bot API client (long polling).
//!
//! API docs: https://core.telegram.org/bots/api
//! Base URL: https://api.telegram.org/bot{token}/
//! Every response is wrapped in `{ "ok": bool, "result": ..., "description": ... }`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.telegram.org";

/// Slack added to the HTTP timeout on top of the long-poll timeout.
const POLL_TIMEOUT_SLACK_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// API types (Telegram JSON -> Rust). Only the fields we use.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    /// Unix timestamp of the message.
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    /// Calendar date the message was sent, as seen in `tz`.
    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.date, 0).map(|utc| utc.with_timezone(tz).date_naive())
    }

    /// Local calendar date the message was sent, falling back to today.
    pub fn local_date(&self) -> NaiveDate {
        self.date_in(&Local)
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct TelegramClient {
    http: Client,
    token: Secret<String>,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: Secret<String>, poll_timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(token, poll_timeout_secs, BASE_URL)
    }

    pub fn with_base_url(token: Secret<String>, poll_timeout_secs: u64, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + POLL_TIMEOUT_SLACK_SECS))
            .user_agent("BETBOOK/0.1.0")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token.expose_secret(), method)
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        // The URL embeds the token, so errors are reported by method name only.
        let resp = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Telegram {method} request failed: {}", e.without_url()))?;

        let status = resp.status();
        let envelope: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("Telegram {method} returned an unreadable body ({status})"))?;

        unwrap_envelope(method, envelope)
    }

    /// Long-poll for message updates with id `>= offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &GetUpdatesRequest {
                    offset,
                    timeout: timeout_secs,
                    allowed_updates: ["message"],
                },
            )
            .await?;
        debug!(count = updates.len(), offset, "Polled updates");
        Ok(updates)
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessageRequest { chat_id, text })
            .await?;
        Ok(())
    }
}

fn unwrap_envelope<T>(method: &str, envelope: ApiResponse<T>) -> Result<T> {
    if !envelope.ok {
        bail!(
            "Telegram {method} failed: {}",
            envelope.description.unwrap_or_else(|| "no description".to_string())
        );
    }
    envelope
        .result
        .with_context(|| format!("Telegram {method} response has no result"))
}

/// Offset acknowledging every update up to and including `updates`.
pub fn next_offset(current: i64, updates: &[Update]) -> i64 {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .map_or(current, |next| next.max(current))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
