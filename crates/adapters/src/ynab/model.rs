//! Wire shapes of the YNAB REST API (v1) and their normalization.

use chrono::NaiveDate;
use engine::{ClearedState, FlagColor, Milliunits, SubTransaction, Transaction, normalize_display};
use serde::{Deserialize, Serialize};

/// Every YNAB response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BudgetsData {
    pub budgets: Vec<BudgetSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BudgetSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountsData {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesData {
    pub category_groups: Vec<CategoryGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryGroup {
    #[serde(default)]
    pub deleted: bool,
    pub categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionsData {
    pub transactions: Vec<TransactionDetail>,
    /// Knowledge to pass as `last_knowledge_of_server` for a delta read.
    pub server_knowledge: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionData {
    pub transaction: TransactionDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveTransactionsData {
    #[serde(default)]
    pub transaction_ids: Vec<String>,
    #[serde(default)]
    pub duplicate_import_ids: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct TransactionDetail {
    pub id: String,
    pub date: NaiveDate,
    pub amount: i64,
    pub memo: Option<String>,
    #[serde(default)]
    pub cleared: ClearedState,
    #[serde(default)]
    pub approved: bool,
    pub flag_color: Option<FlagColor>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub account_name: String,
    pub payee_name: Option<String>,
    pub category_name: Option<String>,
    pub import_id: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub subtransactions: Vec<SubTransactionDetail>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct SubTransactionDetail {
    #[serde(default)]
    pub amount: i64,
    pub category_name: Option<String>,
    pub memo: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl SubTransactionDetail {
    fn normalize(self) -> SubTransaction {
        SubTransaction {
            amount: Milliunits::new(self.amount),
            category: self.category_name.as_deref().and_then(normalize_display),
            memo: self.memo.filter(|memo| !memo.trim().is_empty()),
        }
    }
}

/// Synthetic category YNAB reports on split parents.
const SPLIT_CATEGORY: &str = "split";

impl TransactionDetail {
    /// Canonical form: emoji stripped from names, no synthetic category.
    ///
    /// A split parent whose live subtransactions all share one category is
    /// reported with that category; any other split parent is uncategorized.
    /// Live subtransactions are kept as the parent's lines.
    pub(crate) fn normalize(self, budget_id: &str) -> Transaction {
        let category = self
            .category_name
            .as_deref()
            .and_then(normalize_display)
            .filter(|name| !name.eq_ignore_ascii_case(SPLIT_CATEGORY))
            .or_else(|| single_subcategory(&self.subtransactions));
        let subtransactions = self
            .subtransactions
            .into_iter()
            .filter(|sub| !sub.deleted)
            .map(SubTransactionDetail::normalize)
            .collect();

        Transaction {
            id: self.id,
            budget_id: budget_id.to_string(),
            date: self.date,
            payee: self.payee_name.unwrap_or_default(),
            amount: Milliunits::new(self.amount),
            category,
            memo: self.memo.filter(|memo| !memo.trim().is_empty()),
            cleared: self.cleared,
            approved: self.approved,
            flag: self.flag_color,
            account_name: normalize_display(&self.account_name).unwrap_or_default(),
            account_id: self.account_id,
            import_id: self.import_id,
            deleted: self.deleted,
            subtransactions,
        }
    }
}

fn single_subcategory(subtransactions: &[SubTransactionDetail]) -> Option<String> {
    let mut names = subtransactions
        .iter()
        .filter(|sub| !sub.deleted)
        .map(|sub| sub.category_name.as_deref().and_then(normalize_display));
    let first = names.next()??;
    names
        .all(|name| name.as_deref() == Some(first.as_str()))
        .then_some(first)
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTransaction<'a> {
    pub account_id: &'a str,
    pub date: NaiveDate,
    pub amount: i64,
    pub payee_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<&'a str>,
    pub cleared: ClearedState,
    pub approved: bool,
    pub flag_color: Option<FlagColor>,
    pub import_id: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtransactions: Vec<NewSubTransaction<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewSubTransaction<'a> {
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTransactionBody<'a> {
    pub transaction: NewTransaction<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PatchTransaction<'a> {
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_color: Option<FlagColor>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PatchTransactionsBody<'a> {
    pub transactions: Vec<PatchTransaction<'a>>,
}
