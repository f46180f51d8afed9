//! Handles settings for the application. Configuration is written in
//! `config/shared_budget.toml` and can be overridden from the environment
//! (`SHARED_BUDGET_YNAB__TOKEN`, `SHARED_BUDGET_SERVER__API_KEY`, ...).
//!
//! See `config/shared_budget.toml` for the configuration.
use adapters::{
    SheetsAuth,
    sheets::{self, ServiceAccount},
    ynab,
};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{AppError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/shared_budget.toml";

fn default_level() -> String {
    "info".to_string()
}

fn default_lookback_days() -> u32 {
    7
}

fn default_timeout() -> u64 {
    30
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_ynab_url() -> String {
    ynab::DEFAULT_BASE_URL.to_string()
}

fn default_sheets_url() -> String {
    sheets::DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
    /// Days looked back when a request carries no since-date.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
            lookback_days: default_lookback_days(),
            http_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub api_key: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Ynab {
    #[serde(default = "default_ynab_url")]
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct Sheets {
    #[serde(default = "default_sheets_url")]
    pub base_url: String,
    pub spreadsheet_id: String,
    pub service_account_file: Option<String>,
    pub access_token: Option<String>,
}

impl Sheets {
    /// The service account wins when both credentials are configured.
    pub fn auth(&self) -> Result<SheetsAuth> {
        match (&self.service_account_file, &self.access_token) {
            (Some(path), _) => Ok(SheetsAuth::ServiceAccount(ServiceAccount::from_file(path)?)),
            (None, Some(token)) => Ok(SheetsAuth::AccessToken(token.clone())),
            (None, None) => Err(AppError::Settings(
                "sheets needs service_account_file or access_token".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub ynab: Ynab,
    pub sheets: Sheets,
}

impl Settings {
    /// Reads `path` (required when given explicitly) and the environment.
    pub fn new(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("SHARED_BUDGET")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
