//! [`RuleStore`] backed by a Google spreadsheet.
//!
//! Two tabs are read on every call: `Users` and `Category Mappings`. Both
//! use their first row as the header; column order does not matter.

mod auth;
mod parse;

use engine::{CategoryMapping, EngineError, LedgerError, ResultEngine, RuleStore, User};
use reqwest::Client;
use tracing::debug;

use crate::client::{ApiClient, ApiError};
use parse::{Table, ValueRange, parse_mappings, parse_users};

pub use auth::{CredentialsError, SHEETS_SCOPE, ServiceAccount, ServiceAccountKey, SheetsAuth};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const USERS_TAB: &str = "Users";
pub const MAPPINGS_TAB: &str = "Category Mappings";

pub struct SheetsRuleStore {
    api: ApiClient,
    spreadsheet_id: String,
    auth: SheetsAuth,
}

impl SheetsRuleStore {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        auth: SheetsAuth,
    ) -> Self {
        Self {
            api: ApiClient::new(client, base_url),
            spreadsheet_id: spreadsheet_id.into(),
            auth,
        }
    }

    async fn table(&self, tab: &str) -> ResultEngine<Table> {
        let token = self.auth.bearer(self.api.http()).await?;
        let url = self
            .api
            .url(&["spreadsheets", self.spreadsheet_id.as_str(), "values", tab])?;
        let range: ValueRange = self
            .api
            .get_json(&token, url, &[])
            .await
            .map_err(|err| tab_error(tab, err))?;
        debug!("sheet tab \"{tab}\": {} rows", range.values.len());
        Table::new(tab, range)
    }
}

/// The API answers an unknown tab with 400 ("Unable to parse range").
fn tab_error(tab: &str, err: ApiError) -> EngineError {
    match err.status().map(|status| status.as_u16()) {
        Some(400 | 404) => LedgerError::NotFound(format!("sheet tab \"{tab}\": {err}")).into(),
        _ => err.into(),
    }
}

impl RuleStore for SheetsRuleStore {
    async fn get_users(&self) -> ResultEngine<Vec<User>> {
        parse_users(&self.table(USERS_TAB).await?)
    }

    async fn get_category_mappings(&self) -> ResultEngine<Vec<CategoryMapping>> {
        parse_mappings(&self.table(MAPPINGS_TAB).await?)
    }
}
