//! Bearer tokens for the Sheets API.

use std::{
    path::Path,
    time::{Duration, Instant},
};

use chrono::Utc;
use engine::{EngineError, LedgerError};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime requested for the signed assertion.
const ASSERTION_TTL_SECS: i64 = 3600;
/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("cannot read service account file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed service account file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid service account key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a Google service-account JSON key that matter here.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Service account credentials with the current access token.
pub struct ServiceAccount {
    client_email: String,
    token_uri: String,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    pub fn from_key(key: ServiceAccountKey) -> Result<Self, CredentialsError> {
        Ok(Self {
            key: EncodingKey::from_rsa_pem(key.private_key.as_bytes())?,
            client_email: key.client_email,
            token_uri: key.token_uri,
            cached: Mutex::new(None),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialsError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_key(serde_json::from_str(&raw)?)
    }

    fn assertion(&self) -> Result<String, EngineError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|err| LedgerError::Auth(format!("cannot sign assertion: {err}")).into())
    }

    async fn token(&self, http: &Client) -> Result<String, EngineError> {
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref()
            && Instant::now() < current.refresh_at
        {
            return Ok(current.token.clone());
        }

        debug!("exchanging assertion for {} at {}", self.client_email, self.token_uri);
        let assertion = self.assertion()?;
        let resp = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|err| LedgerError::Transport(format!("token exchange failed: {err}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Auth(format!("token exchange rejected ({status}): {body}")).into());
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|err| LedgerError::Transport(format!("malformed token response: {err}")))?;

        let lifetime = Duration::from_secs(token.expires_in);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        });
        Ok(token.access_token)
    }
}

/// How the rule store authenticates against the Sheets API.
pub enum SheetsAuth {
    ServiceAccount(ServiceAccount),
    /// Pre-issued OAuth access token.
    AccessToken(String),
}

impl SheetsAuth {
    pub(crate) async fn bearer(&self, http: &Client) -> Result<String, EngineError> {
        match self {
            SheetsAuth::ServiceAccount(account) => account.token(http).await,
            SheetsAuth::AccessToken(token) => Ok(token.clone()),
        }
    }
}
