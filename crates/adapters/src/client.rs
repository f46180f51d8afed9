//! Thin JSON-over-HTTPS client shared by the ledger and sheet adapters.

use engine::{EngineError, LedgerError};
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(err) => err.status(),
            ApiError::Url(_) => None,
        }
    }
}

impl From<ApiError> for LedgerError {
    fn from(err: ApiError) -> Self {
        match err.status().map(|status| status.as_u16()) {
            Some(401 | 403) => LedgerError::Auth(err.to_string()),
            Some(404) => LedgerError::NotFound(err.to_string()),
            Some(400..=499) => LedgerError::Rejected(err.to_string()),
            _ => LedgerError::Transport(err.to_string()),
        }
    }
}

impl From<ApiError> for EngineError {
    fn from(err: ApiError) -> Self {
        EngineError::Ledger(err.into())
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// `base_url` followed by `segments`, each percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|err| ApiError::Url(format!("{}: {err}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_json<TResp: DeserializeOwned>(
        &self,
        token: &str,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<TResp, ApiError> {
        debug!("GET {url}");
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        Self::read(resp).await
    }

    pub async fn send_json<TReq: Serialize + ?Sized, TResp: DeserializeOwned>(
        &self,
        method: Method,
        token: &str,
        url: Url,
        body: &TReq,
    ) -> Result<TResp, ApiError> {
        debug!("{method} {url}");
        let resp = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        Self::read(resp).await
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    async fn read<TResp: DeserializeOwned>(resp: reqwest::Response) -> Result<TResp, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<TResp>().await?);
        }

        let message = match resp.text().await {
            Ok(body) => error_message(&body),
            Err(_) => "server error".to_string(),
        };
        Err(ApiError::Server { status, message })
    }
}

/// Human readable message out of an error body.
///
/// Both services nest it differently (`error.detail` for the ledger,
/// `error.message` for the sheets API); fall back to the raw body.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    let error = &value["error"];
    for key in ["detail", "message"] {
        if let Some(message) = error[key].as_str() {
            return message.to_string();
        }
    }
    match error.as_str() {
        Some(message) => message.to_string(),
        None => body.trim().to_string(),
    }
}
