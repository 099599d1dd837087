//! Google Sheets ledger.
//!
//! API docs: https://developers.google.com/sheets/api/reference/rest
//! Base URL: https://sheets.googleapis.com/v4/spreadsheets/{spreadsheetId}
//! Auth: `Authorization: Bearer {token}` from a service account
//!
//! Values are read as formatted strings. Structural edits (new sheets,
//! inserted rows, formatting) go through `:batchUpdate`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::auth::ServiceAccountAuth;
use super::{FormatRequest, LedgerService, Rgb, WHITE};
use crate::error::LedgerError;
use crate::types::{Column, InputMode, LedgerRow, Outcome, SheetHandle, SheetInfo, COLUMN_COUNT};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const LEDGER_NAME: &str = "google-sheets";

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct ValueRangeBody<'a> {
    values: &'a [LedgerRow],
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Google Sheets client bound to one spreadsheet.
pub struct SheetsClient {
    http: Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: String, auth: ServiceAccountAuth) -> Result<Self, LedgerError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("BETBOOK/0.1.0 (bet-ledger-bot)")
            .build()?;

        info!(
            spreadsheet_id = %spreadsheet_id,
            client_email = %auth.client_email(),
            "Google Sheets ledger configured"
        );

        Ok(Self {
            http,
            auth,
            spreadsheet_id,
        })
    }

    // -- Internal helpers ------------------------------------------------

    fn values_url(&self, title: &str, range: &str) -> String {
        format!(
            "{BASE_URL}/{}/values/{}",
            self.spreadsheet_id,
            urlencoding::encode(&format!("{title}!{range}")),
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, LedgerError> {
        let token = self.auth.access_token().await?;
        let resp = request.bearer_auth(token.expose_secret()).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Api { status, body });
        }
        Ok(resp)
    }

    async fn batch_update(&self, requests: Vec<Value>) -> Result<BatchUpdateResponse, LedgerError> {
        let url = format!("{BASE_URL}/{}:batchUpdate", self.spreadsheet_id);
        debug!(count = requests.len(), "Sheets batchUpdate");

        let resp = self
            .send(self.http.post(&url).json(&json!({ "requests": requests })))
            .await?;

        resp.json()
            .await
            .map_err(|e| LedgerError::Malformed(format!("batchUpdate response: {e}")))
    }

    /// Render a formatted cell value (string, number or bool) as text.
    fn cell_text(value: Value) -> String {
        match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn color(rgb: Rgb) -> Value {
        json!({ "red": rgb.red, "green": rgb.green, "blue": rgb.blue })
    }

    /// Grid range over every ledger column for 1-based rows `first..=last`.
    fn row_grid(sheet_id: i64, first: usize, last: usize) -> Value {
        json!({
            "sheetId": sheet_id,
            "startRowIndex": first - 1,
            "endRowIndex": last,
            "startColumnIndex": 0,
            "endColumnIndex": COLUMN_COUNT,
        })
    }

    fn outcome_grid(sheet_id: i64, first: usize, last: usize) -> Value {
        let col = Column::WinLose.index();
        json!({
            "sheetId": sheet_id,
            "startRowIndex": first - 1,
            "endRowIndex": last,
            "startColumnIndex": col,
            "endColumnIndex": col + 1,
        })
    }

    /// Translate a formatting request into a Sheets API request object.
    fn format_request_json(sheet_id: i64, request: &FormatRequest) -> Value {
        match request {
            FormatRequest::HeaderStyle { row } => json!({
                "repeatCell": {
                    "range": Self::row_grid(sheet_id, *row, *row),
                    "cell": { "userEnteredFormat": {
                        "backgroundColor": Self::color(super::HEADER_BACKGROUND),
                        "textFormat": { "bold": true },
                    }},
                    "fields": "userEnteredFormat(backgroundColor,textFormat)",
                }
            }),
            FormatRequest::MarkerStyle { row } => json!({
                "repeatCell": {
                    "range": Self::row_grid(sheet_id, *row, *row),
                    "cell": { "userEnteredFormat": {
                        "backgroundColor": Self::color(super::MARKER_BACKGROUND),
                    }},
                    "fields": "userEnteredFormat.backgroundColor",
                }
            }),
            FormatRequest::OutcomeValidation { first_row, last_row } => {
                let values: Vec<Value> = Outcome::ALL
                    .iter()
                    .map(|o| json!({ "userEnteredValue": o.as_str() }))
                    .collect();
                json!({
                    "setDataValidation": {
                        "range": Self::outcome_grid(sheet_id, *first_row, *last_row),
                        "rule": {
                            "condition": { "type": "ONE_OF_LIST", "values": values },
                            "showCustomUi": true,
                        }
                    }
                })
            }
            FormatRequest::OutcomeHighlight {
                outcome,
                first_row,
                last_row,
                priority,
            } => json!({
                "addConditionalFormatRule": {
                    "rule": {
                        "ranges": [Self::outcome_grid(sheet_id, *first_row, *last_row)],
                        "booleanRule": {
                            "condition": {
                                "type": "TEXT_EQ",
                                "values": [{ "userEnteredValue": outcome.as_str() }],
                            },
                            "format": {
                                "backgroundColor": Self::color(outcome.highlight()),
                                "textFormat": {
                                    "foregroundColor": Self::color(WHITE),
                                    "bold": true,
                                },
                            },
                        },
                    },
                    "index": priority,
                }
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerService trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl LedgerService for SheetsClient {
    async fn sheet_metadata(&self) -> Result<Vec<SheetInfo>, LedgerError> {
        let url = format!(
            "{BASE_URL}/{}?fields=sheets.properties(sheetId,title)",
            self.spreadsheet_id
        );
        let resp = self.send(self.http.get(&url)).await?;
        let spreadsheet: Spreadsheet = resp
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(format!("spreadsheet metadata: {e}")))?;

        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| SheetInfo {
                title: s.properties.title,
                id: s.properties.sheet_id,
            })
            .collect())
    }

    async fn create_sheet(&self, title: &str) -> Result<i64, LedgerError> {
        let response = self
            .batch_update(vec![json!({ "addSheet": { "properties": { "title": title } } })])
            .await?;

        let id = response
            .replies
            .first()
            .and_then(|r| r.pointer("/addSheet/properties/sheetId"))
            .and_then(Value::as_i64)
            .ok_or_else(|| LedgerError::Malformed("addSheet reply without sheetId".to_string()))?;

        info!(title, id, "Sheet created");
        Ok(id)
    }

    async fn read_range(&self, title: &str, range: &str) -> Result<Vec<LedgerRow>, LedgerError> {
        let url = self.values_url(title, range);
        debug!(title, range, "Reading range");

        let resp = self.send(self.http.get(&url)).await?;
        let value_range: ValueRange = resp
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(format!("values response: {e}")))?;

        Ok(value_range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(Self::cell_text).collect())
            .collect())
    }

    async fn write_range(
        &self,
        title: &str,
        range: &str,
        values: Vec<LedgerRow>,
        mode: InputMode,
    ) -> Result<(), LedgerError> {
        let url = self.values_url(title, range);
        debug!(title, range, mode = mode.as_api_str(), rows = values.len(), "Writing range");

        self.send(
            self.http
                .put(&url)
                .query(&[("valueInputOption", mode.as_api_str())])
                .json(&ValueRangeBody { values: &values }),
        )
        .await?;
        Ok(())
    }

    async fn insert_rows(
        &self,
        sheet: &SheetHandle,
        at: usize,
        count: usize,
    ) -> Result<(), LedgerError> {
        if at == 0 {
            return Err(LedgerError::InvalidRange(format!("row {at}")));
        }
        self.batch_update(vec![json!({
            "insertRange": {
                "range": {
                    "sheetId": sheet.id,
                    "startRowIndex": at - 1,
                    "endRowIndex": at - 1 + count,
                },
                "shiftDimension": "ROWS",
            }
        })])
        .await?;
        debug!(title = %sheet.title, at, count, "Rows inserted");
        Ok(())
    }

    async fn apply_formatting(
        &self,
        sheet: &SheetHandle,
        requests: &[FormatRequest],
    ) -> Result<(), LedgerError> {
        if requests.is_empty() {
            return Ok(());
        }
        let body = requests
            .iter()
            .map(|r| Self::format_request_json(sheet.id, r))
            .collect();
        self.batch_update(body).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        LEDGER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
