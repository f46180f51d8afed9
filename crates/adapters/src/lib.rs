//! HTTP implementations of the engine's ports: the YNAB ledger and the
//! Google Sheets rule store.

pub mod client;
pub mod sheets;
pub mod ynab;

pub use client::{ApiClient, ApiError};
pub use sheets::{SheetsAuth, SheetsRuleStore};
pub use ynab::YnabLedger;
