//! Google service-account credentials.
//!
//! Auth flow (OAuth 2.0 JWT bearer grant):
//! 1. Sign an RS256 JWT with the service account's private key, claiming
//!    the spreadsheets scope.
//! 2. POST it to the key's `token_uri`.
//! 3. Cache the returned access token until shortly before it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::LedgerError;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields we need from a service-account JSON key file.
#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: Secret<String>,
    expires_at: DateTime<Utc>,
}

/// Access-token source backed by a service-account key.
pub struct ServiceAccountAuth {
    http: Client,
    client_email: String,
    token_uri: String,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Load a service-account key file (the JSON downloaded from the
    /// Google Cloud console).
    pub fn from_file(path: &str) -> Result<Self, LedgerError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Auth(format!("failed to read service account file {path}: {e}"))
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| LedgerError::Auth(format!("invalid service account key: {e}")))?;

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| LedgerError::Auth(format!("invalid service account private key: {e}")))?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            client_email: key.client_email,
            token_uri: key.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            key: encoding_key,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// A valid bearer token, fetching a new one if the cached token is
    /// missing or about to expire.
    pub async fn access_token(&self) -> Result<Secret<String>, LedgerError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now {
                return Ok(Secret::new(token.token.expose_secret().clone()));
            }
        }

        let fresh = self.fetch_token(now).await?;
        let token = Secret::new(fresh.token.expose_secret().clone());
        *cached = Some(fresh);
        Ok(token)
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, LedgerError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| LedgerError::Auth(format!("failed to sign assertion: {e}")))
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<CachedToken, LedgerError> {
        let assertion = self.sign_assertion(now)?;
        debug!(client_email = %self.client_email, "Requesting Google access token");

        let resp = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Auth(format!("failed to parse token response: {e}")))?;

        info!(expires_in = token.expires_in, "Google access token refreshed");

        Ok(CachedToken {
            token: Secret::new(token.access_token),
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
